//! Team orchestrator
//!
//! Drives the turn loop: select a speaker, let it respond (including any tool
//! calls), append the message, spend one turn, check for approval. Stops on
//! approval, an empty budget, a model failure, or cancellation between turns.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::conversation::Transcript;
use crate::agent::loop_state::{TerminationReason, TerminationState, TurnBudget};
use crate::agent::role::RoleAgent;
use crate::agent::selector::{SelectorPolicy, TurnSelector};
use crate::agent::termination::TerminationDetector;
use crate::core::{CrewError, Message, Result, RoleId};

/// Everything a run needs, with no environment or network assumptions
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    /// Team members in round-robin order
    pub roster: Vec<RoleAgent>,
    pub selector: SelectorPolicy,
    pub termination_token: String,
    pub max_turns: usize,
}

impl OrchestrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.roster.is_empty() {
            return Err(CrewError::config("The team needs at least one role"));
        }
        let mut seen = HashSet::new();
        for agent in &self.roster {
            if !seen.insert(agent.id()) {
                return Err(CrewError::config(format!("{} appears twice on the roster", agent.id())));
            }
        }
        if self.max_turns == 0 {
            return Err(CrewError::config("max_turns must be at least 1"));
        }
        if self.termination_token.trim().is_empty() {
            return Err(CrewError::config("termination token must not be empty"));
        }
        Ok(())
    }
}

/// Something the caller may want to show while the run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    /// A message was appended (the seed included)
    Message(Message),
    /// The model-driven selector was overruled for this turn
    SpeakerFallback { reason: String, speaker: RoleId },
    /// The run is over; always the final event
    Terminated(TerminationReason),
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reason: TerminationReason,
    pub transcript: Vec<Message>,
    /// Turns taken by team members
    pub turns: usize,
}

impl RunOutcome {
    pub fn is_approved(&self) -> bool {
        self.reason.is_approved()
    }

    /// The message that carried the approval, if any
    pub fn approval(&self) -> Option<&Message> {
        if self.is_approved() {
            self.transcript.last()
        } else {
            None
        }
    }
}

/// Runs a team against a seed prompt. Holds no per-run state, so one
/// orchestrator can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<OrchestrationConfig>,
    detector: TerminationDetector,
}

impl Orchestrator {
    pub fn new(config: OrchestrationConfig) -> Result<Self> {
        config.validate()?;
        let detector = TerminationDetector::new(config.termination_token.clone());
        Ok(Self {
            config: Arc::new(config),
            detector,
        })
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Run to completion without observing events
    pub async fn run(&self, seed_prompt: &str) -> RunOutcome {
        self.run_with(seed_prompt, &CancellationToken::new(), |_| {})
            .await
    }

    /// Run to completion, reporting each event as it happens.
    ///
    /// Cancellation is honoured only between turns; a turn in progress,
    /// including its SQL, always finishes.
    pub async fn run_with<F>(
        &self,
        seed_prompt: &str,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> RunOutcome
    where
        F: FnMut(&TranscriptEvent) + Send,
    {
        let roster = &self.config.roster;
        let mut transcript = Transcript::seeded(seed_prompt);
        let mut budget = TurnBudget::new(self.config.max_turns);
        let mut state = TerminationState::new();
        let mut selector = TurnSelector::new(&self.config.selector);

        if let Some(seed) = transcript.last() {
            on_event(&TranscriptEvent::Message(seed.clone()));
        }

        info!(
            roles = roster.len(),
            max_turns = budget.ceiling(),
            selector = ?self.config.selector,
            "starting run"
        );

        while !state.is_terminated() {
            if cancel.is_cancelled() {
                state.terminate(TerminationReason::Cancelled);
                break;
            }
            if budget.is_exhausted() {
                state.terminate(TerminationReason::TurnLimitReached);
                break;
            }

            let turn = budget.used() + 1;
            let index = match selector.select(roster, &transcript).await {
                Ok(index) => index,
                Err(CrewError::Selection(reason)) => {
                    let index = selector.round_robin_next(roster.len());
                    warn!(turn, error = %reason, "selector fell back to round-robin");
                    on_event(&TranscriptEvent::SpeakerFallback {
                        reason: reason.to_string(),
                        speaker: roster[index].id(),
                    });
                    index
                }
                Err(e) => {
                    error!(turn, error = %e, "speaker selection failed");
                    state.terminate(TerminationReason::Failed {
                        error: e.to_string(),
                    });
                    break;
                }
            };
            selector.record(index);

            let agent = &roster[index];
            info!(turn, role = %agent.id(), remaining = budget.remaining(), "turn started");

            let message = match agent.respond(&transcript).await {
                Ok(message) => message,
                Err(e) => {
                    error!(turn, role = %agent.id(), error = %e, "turn failed");
                    state.terminate(TerminationReason::Failed {
                        error: e.to_string(),
                    });
                    break;
                }
            };

            let approved = self.detector.check(&message);
            let stored = transcript.push(message);
            on_event(&TranscriptEvent::Message(stored.clone()));
            budget.consume();

            if approved {
                info!(turn, role = %agent.id(), "approval received");
                state.terminate(TerminationReason::Approved);
            }
        }

        let reason = state
            .reason()
            .cloned()
            .unwrap_or(TerminationReason::TurnLimitReached);

        info!(reason = %reason, turns = budget.used(), "run finished");
        on_event(&TranscriptEvent::Terminated(reason.clone()));

        RunOutcome {
            reason,
            turns: budget.used(),
            transcript: transcript.into_messages(),
        }
    }

    /// Spawn the run and stream its events.
    ///
    /// Dropping the stream cancels the run at the next turn boundary.
    pub fn run_stream(
        &self,
        seed_prompt: impl Into<String>,
        cancel: CancellationToken,
    ) -> (UnboundedReceiverStream<TranscriptEvent>, JoinHandle<RunOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.clone();
        let seed_prompt = seed_prompt.into();
        let cancel = cancel.child_token();

        let handle = tokio::spawn(async move {
            let abandon = cancel.clone();
            orchestrator
                .run_with(&seed_prompt, &cancel, move |event| {
                    if tx.send(event.clone()).is_err() {
                        abandon.cancel();
                    }
                })
                .await
        });

        (UnboundedReceiverStream::new(rx), handle)
    }
}
