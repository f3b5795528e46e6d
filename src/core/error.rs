//! Custom error types for datacrew
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for datacrew operations
#[derive(Error, Debug)]
pub enum CrewError {
    /// Missing or malformed configuration (credentials, connection string)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The language model client failed (network, auth, bad response)
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// Model rejected by the provider
    #[error("Model '{0}' is not available from the configured provider")]
    ModelNotFound(String),

    /// Speaker selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Database errors outside of agent tool calls
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by the model-driven turn selector.
///
/// These never reach the end user: the orchestration loop falls back to
/// round-robin for the turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The selector named something that is not on the roster
    #[error("'{0}' is not a member of the team")]
    InvalidSelection(String),

    /// The selector picked the agent that just spoke
    #[error("'{0}' spoke last turn and cannot speak twice in a row")]
    RepeatedSpeaker(String),

    /// The roster is empty
    #[error("no agents to select from")]
    EmptyRoster,
}

/// Convenience Result type for datacrew operations
pub type Result<T> = std::result::Result<T, CrewError>;

impl CrewError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a model call error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelCall(msg.into())
    }

    /// Whether this error came from the language model client
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelCall(_) | Self::ModelNotFound(_) | Self::Http(_)
        )
    }
}
