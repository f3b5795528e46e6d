//! Database collaborators
//!
//! The team only sees two capabilities: a text description of the schema and
//! a way to run a query. `PostgresManager` provides both.

pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{Result, ToolError};

pub use postgres::PostgresManager;
pub use schema::{format_table_definitions, ColumnInfo};

/// One result row, keyed by column name
pub type SqlRow = serde_json::Map<String, serde_json::Value>;

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<SqlRow>,
    /// Set when rows beyond the configured cap were dropped
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Describes the tables available to the team
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// All table/column definitions, formatted for a prompt
    async fn table_definitions(&self) -> Result<String>;
}

/// Runs SQL on behalf of the analyst role.
///
/// Failures are returned as a structured `ToolError`, never as a crate error:
/// a bad query is something the team recovers from.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn run_sql(&self, query: &str) -> std::result::Result<QueryRows, ToolError>;
}
