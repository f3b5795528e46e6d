//! Orchestration loop state
//!
//! Turn budget and the terminal status of a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceiling on the number of turns in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnBudget {
    ceiling: usize,
    remaining: usize,
}

impl TurnBudget {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            remaining: ceiling,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Turns completed so far
    pub fn used(&self) -> usize {
        self.ceiling - self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Record one completed turn
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum TerminationReason {
    /// A message carried the termination token
    Approved,
    /// The turn budget ran out first
    TurnLimitReached,
    /// The language model client failed
    Failed { error: String },
    /// The caller cancelled the run between turns
    Cancelled,
}

impl TerminationReason {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::TurnLimitReached => write!(f, "TURN LIMIT REACHED"),
            Self::Failed { error } => write!(f, "FAILED: {}", error),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Run status. Once terminated it stays terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationState {
    reason: Option<TerminationReason>,
}

impl TerminationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.reason.is_some()
    }

    pub fn reason(&self) -> Option<&TerminationReason> {
        self.reason.as_ref()
    }

    /// Set the terminal reason. Returns false, leaving the first reason in
    /// place, if the run had already terminated.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.reason.is_some() {
            return false;
        }
        self.reason = Some(reason);
        true
    }
}
