//! Speaker selection
//!
//! Round-robin walks the roster in declared order. Model-driven selection
//! asks the model to name the next role and rejects answers that are not on
//! the roster or that repeat the previous speaker; the orchestrator then
//! falls back to round-robin for that turn.

use std::sync::Arc;

use tracing::debug;

use crate::agent::conversation::Transcript;
use crate::agent::role::{context_text, RoleAgent};
use crate::agent::termination::contains_word;
use crate::core::{ChatMessage, Result, SelectionError};
use crate::llm::{GenerateOptions, LLMProvider};

/// How the next speaker is chosen, fixed for a whole run
#[derive(Clone)]
pub enum SelectorPolicy {
    RoundRobin,
    ModelDriven {
        llm: Arc<dyn LLMProvider>,
        model: String,
    },
}

impl std::fmt::Debug for SelectorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundRobin => f.write_str("RoundRobin"),
            Self::ModelDriven { model, .. } => {
                f.debug_struct("ModelDriven").field("model", model).finish()
            }
        }
    }
}

/// Per-run selector state
#[derive(Debug)]
pub struct TurnSelector<'a> {
    policy: &'a SelectorPolicy,
    last: Option<usize>,
}

impl<'a> TurnSelector<'a> {
    pub fn new(policy: &'a SelectorPolicy) -> Self {
        Self { policy, last: None }
    }

    /// Index of the previous speaker
    pub fn last(&self) -> Option<usize> {
        self.last
    }

    /// Record who actually spoke
    pub fn record(&mut self, index: usize) {
        self.last = Some(index);
    }

    /// The roster entry after the previous speaker, wrapping
    pub fn round_robin_next(&self, roster_len: usize) -> usize {
        match self.last {
            Some(last) if roster_len > 0 => (last + 1) % roster_len,
            _ => 0,
        }
    }

    /// Pick the next speaker's index in `roster`.
    ///
    /// Fails with `CrewError::Selection` when the model names an unusable
    /// role; any other error is a model failure.
    pub async fn select(&self, roster: &[RoleAgent], transcript: &Transcript) -> Result<usize> {
        if roster.is_empty() {
            return Err(SelectionError::EmptyRoster.into());
        }

        match self.policy {
            SelectorPolicy::RoundRobin => Ok(self.round_robin_next(roster.len())),
            SelectorPolicy::ModelDriven { llm, model } => {
                if roster.len() == 1 {
                    return Ok(0);
                }
                let prompt = selector_prompt(roster, self.candidates(roster), transcript);
                let response = llm
                    .chat(
                        model,
                        &[ChatMessage::system(prompt)],
                        Some(GenerateOptions {
                            temperature: Some(0.0),
                            ..Default::default()
                        }),
                    )
                    .await?;
                debug!(answer = %response.content.trim(), "selector answered");
                Ok(self.resolve(roster, &response.content)?)
            }
        }
    }

    /// Everyone except the previous speaker
    fn candidates<'r>(&self, roster: &'r [RoleAgent]) -> Vec<&'r RoleAgent> {
        roster
            .iter()
            .enumerate()
            .filter(|(i, _)| roster.len() == 1 || Some(*i) != self.last)
            .map(|(_, agent)| agent)
            .collect()
    }

    /// Map the model's answer onto a roster index
    fn resolve(
        &self,
        roster: &[RoleAgent],
        answer: &str,
    ) -> std::result::Result<usize, SelectionError> {
        let cleaned = answer
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase();

        let exact = roster.iter().position(|agent| {
            agent.name().to_lowercase() == cleaned || agent.id().key() == cleaned
        });

        let index = match exact {
            Some(index) => index,
            None => {
                // Fall back to scanning for a single mentioned name.
                let lowered = answer.to_lowercase();
                let mentioned: Vec<usize> = roster
                    .iter()
                    .enumerate()
                    .filter(|(_, agent)| contains_word(&lowered, &agent.name().to_lowercase()))
                    .map(|(i, _)| i)
                    .collect();
                match mentioned.as_slice() {
                    [only] => *only,
                    _ => return Err(SelectionError::InvalidSelection(answer.trim().to_string())),
                }
            }
        };

        if roster.len() > 1 && Some(index) == self.last {
            return Err(SelectionError::RepeatedSpeaker(roster[index].name().to_string()));
        }
        Ok(index)
    }
}

fn selector_prompt(roster: &[RoleAgent], candidates: Vec<&RoleAgent>, transcript: &Transcript) -> String {
    let roles = roster
        .iter()
        .map(|agent| format!("{}: {}", agent.name(), agent.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let participants = candidates
        .iter()
        .map(|agent| agent.name())
        .collect::<Vec<_>>()
        .join(", ");

    let history = transcript
        .messages()
        .iter()
        .map(|message| format!("{}: {}", message.speaker, context_text(message)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are in a role play game. The following roles are available:\n{roles}.\n\
         Read the following conversation. Then select the next role from [{participants}] to play. Only return the role.\n\n\
         {history}\n\n\
         Read the above conversation. Then select the next role from [{participants}] to play. Only return the role."
    )
}
