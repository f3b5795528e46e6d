//! The `run_sql` tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::core::{ToolDefinition, ToolError};
use crate::db::SqlExecutor;
use crate::tools::Tool;

pub const RUN_SQL: &str = "run_sql";

/// Runs a query through the configured executor
#[derive(Clone)]
pub struct SqlTool {
    executor: Arc<dyn SqlExecutor>,
}

impl SqlTool {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    /// Pull the query out of the arguments. A bare string is accepted too,
    /// since some models skip the object wrapper.
    fn query_from(arguments: &Value) -> Option<&str> {
        let sql = match arguments {
            Value::String(sql) => Some(sql.as_str()),
            other => other.get("sql").and_then(Value::as_str),
        };
        sql.map(str::trim).filter(|sql| !sql.is_empty())
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            RUN_SQL,
            "Run a SQL query against the postgres database",
            json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "The SQL query to run"
                    }
                },
                "required": ["sql"]
            }),
        )
    }

    async fn invoke(&self, arguments: &Value) -> std::result::Result<Value, ToolError> {
        let sql = Self::query_from(arguments)
            .ok_or_else(|| ToolError::new("run_sql requires a non-empty 'sql' string argument"))?;

        let rows = self.executor.run_sql(sql).await?;
        info!(rows = rows.rows.len(), truncated = rows.truncated, "query succeeded");

        serde_json::to_value(rows).map_err(|e| ToolError::new(format!("Failed to encode rows: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryRows;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn run_sql(&self, query: &str) -> std::result::Result<QueryRows, ToolError> {
            self.seen.lock().unwrap().push(query.to_string());
            if query.contains("nonexistent_table") {
                return Err(ToolError {
                    code: Some("42P01".into()),
                    message: "relation \"nonexistent_table\" does not exist".into(),
                    detail: None,
                    hint: None,
                });
            }
            let mut row = crate::db::SqlRow::new();
            row.insert("total".into(), json!("1234.50"));
            Ok(QueryRows {
                columns: vec!["total".into()],
                rows: vec![row],
                truncated: false,
            })
        }
    }

    #[test]
    fn test_definition() {
        let tool = SqlTool::new(Arc::new(RecordingExecutor::default()));
        let def = tool.definition();
        assert_eq!(def.name(), "run_sql");
        assert_eq!(def.function.parameters["required"], json!(["sql"]));
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let executor = Arc::new(RecordingExecutor::default());
        let tool = SqlTool::new(executor.clone());
        let output = tool
            .invoke(&json!({"sql": "  SELECT SUM(amount) AS total FROM sales  "}))
            .await
            .unwrap();
        assert_eq!(output["rows"][0]["total"], "1234.50");
        assert_eq!(
            executor.seen.lock().unwrap().as_slice(),
            ["SELECT SUM(amount) AS total FROM sales"]
        );
    }

    #[tokio::test]
    async fn test_invoke_database_error() {
        let tool = SqlTool::new(Arc::new(RecordingExecutor::default()));
        let err = tool
            .invoke(&json!({"sql": "SELECT * FROM nonexistent_table"}))
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("42P01"));
    }

    #[test]
    fn test_missing_sql_argument() {
        let executor = Arc::new(RecordingExecutor::default());
        let tool = SqlTool::new(executor.clone());
        let err = tokio_test::block_on(tool.invoke(&json!({"query": "SELECT 1"}))).unwrap_err();
        assert!(err.message.contains("'sql'"));
        assert!(executor.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bare_string_argument() {
        assert_eq!(SqlTool::query_from(&json!("SELECT 1")), Some("SELECT 1"));
        assert_eq!(SqlTool::query_from(&json!({"sql": "   "})), None);
    }
}
