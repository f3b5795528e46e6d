//! Agent module - the team and its turn-taking protocol
//!
//! Contains role agents, speaker selection, approval detection and the
//! orchestration loop that ties them together.

pub mod conversation;
pub mod loop_state;
pub mod orchestrator;
pub mod prompt;
pub mod role;
pub mod selector;
pub mod team;
pub mod termination;

pub use conversation::Transcript;
pub use loop_state::{TerminationReason, TerminationState, TurnBudget};
pub use orchestrator::{OrchestrationConfig, Orchestrator, RunOutcome, TranscriptEvent};
pub use prompt::{add_cap_ref, extract_cap_ref, seed_prompt};
pub use role::{RoleAgent, RoleAgentBuilder};
pub use selector::{SelectorPolicy, TurnSelector};
pub use team::{default_roster, orchestration_config, TeamSettings};
pub use termination::TerminationDetector;
