//! datacrew - a team of LLM agents that answers questions from a database
//!
//! A request is framed with the database schema and handed to four roles:
//! an administrator who plans, a data engineer who drafts SQL, a senior
//! analyst who runs it, and a product manager who approves the answer.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: LLM provider abstraction with an OpenAI-compatible client
//! - **DB**: Schema provider and SQL executor, with a PostgreSQL manager
//! - **Tools**: The `run_sql` tool bound to the analyst
//! - **Agent**: Roles, speaker selection, and the orchestration loop
//! - **CLI**: Live transcript rendering
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use datacrew::agent::{orchestration_config, seed_prompt, Orchestrator};
//! use datacrew::db::{PostgresManager, SchemaProvider};
//! use datacrew::llm::OpenAiClient;
//! use datacrew::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let db = Arc::new(PostgresManager::connect(&config.database).await?);
//!     let llm = Arc::new(OpenAiClient::from_config(&config)?);
//!
//!     let prompt = seed_prompt("show me total sales for 2023", &db.table_definitions().await?);
//!     let orchestrator = Orchestrator::new(orchestration_config(&config, llm, db)?)?;
//!
//!     let outcome = orchestrator.run(&prompt).await;
//!     println!("{}", outcome.reason);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod db;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Orchestrator, RunOutcome, TerminationReason};
pub use core::{Config, CrewError, Result};
