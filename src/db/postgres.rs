//! PostgreSQL manager
//!
//! Pooled connection used for schema introspection and for the analyst's
//! `run_sql` tool.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgColumn, PgDatabaseError, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::core::config::DatabaseConfig;
use crate::core::{CrewError, Result, ToolError};
use crate::db::schema::{format_table_definitions, ColumnInfo};
use crate::db::{QueryRows, SchemaProvider, SqlExecutor, SqlRow};

const COLUMNS_QUERY: &str = "SELECT table_name::text, column_name::text, data_type::text, is_nullable::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 \
     ORDER BY table_name, ordinal_position";

/// PostgreSQL-backed schema provider and SQL executor
#[derive(Clone)]
pub struct PostgresManager {
    pool: PgPool,
    schema: String,
    max_rows: usize,
}

impl PostgresManager {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| CrewError::config("DATABASE_URL not set"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs.max(1)))
            .connect(url)
            .await?;

        info!(schema = %config.schema, "connected to database");

        Ok(Self::with_pool(pool, config.schema.clone(), config.max_rows))
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: PgPool, schema: impl Into<String>, max_rows: usize) -> Self {
        Self {
            pool,
            schema: schema.into(),
            max_rows,
        }
    }

    /// Column metadata for every table in the configured schema
    pub async fn columns(&self) -> Result<Vec<ColumnInfo>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(COLUMNS_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(table, column, data_type, nullable)| {
                ColumnInfo::new(table, column, data_type, nullable == "YES")
            })
            .collect())
    }

    /// Close the pool, waiting for checked-out connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Column names from the statement description, for empty results
    async fn result_columns(&self, query: &str) -> Vec<String> {
        match self.pool.prepare(query).await {
            Ok(statement) => column_names(statement.columns()),
            Err(e) => {
                debug!(error = %e, "could not describe result columns");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SchemaProvider for PostgresManager {
    async fn table_definitions(&self) -> Result<String> {
        let columns = self.columns().await?;
        debug!(columns = columns.len(), "introspected schema");
        Ok(format_table_definitions(&columns))
    }
}

#[async_trait]
impl SqlExecutor for PostgresManager {
    async fn run_sql(&self, query: &str) -> std::result::Result<QueryRows, ToolError> {
        debug!(sql = %query, "running query");

        let fail = |e: sqlx::Error| {
            let error = to_tool_error(&e);
            warn!(code = ?error.code, error = %error.message, "query failed");
            error
        };

        // Read at most one row past the cap, then drop the stream.
        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(query).fetch(&self.pool);
            while let Some(row) = stream.try_next().await.map_err(fail)? {
                if rows.len() == self.max_rows {
                    truncated = true;
                    break;
                }
                rows.push(row);
            }
        }

        let columns = match rows.first() {
            Some(row) => column_names(row.columns()),
            None => self.result_columns(query).await,
        };

        Ok(QueryRows {
            columns,
            rows: rows.iter().map(row_to_json).collect(),
            truncated,
        })
    }
}

fn column_names(columns: &[PgColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn to_tool_error(error: &sqlx::Error) -> ToolError {
    match error {
        sqlx::Error::Database(db) => {
            let pg = db.try_downcast_ref::<PgDatabaseError>();
            ToolError {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
                detail: pg.and_then(|e| e.detail()).map(str::to_string),
                hint: pg.and_then(|e| e.hint()).map(str::to_string),
            }
        }
        other => ToolError::new(other.to_string()),
    }
}

fn row_to_json(row: &PgRow) -> SqlRow {
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_value(row, column.ordinal());
            (column.name().to_string(), value)
        })
        .collect()
}

/// Decode a cell into JSON based on its Postgres type.
/// NUMERIC and temporal values are rendered as strings to keep precision.
fn decode_value(row: &PgRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    let decoded: std::result::Result<Value, sqlx::Error> = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::from),
        "INT2" => row.try_get::<i16, _>(index).map(Value::from),
        "INT4" => row.try_get::<i32, _>(index).map(Value::from),
        "INT8" => row.try_get::<i64, _>(index).map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::from(v as f64)),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::from),
        "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .map(|d| Value::String(d.to_string())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .map(|u| Value::String(u.to_string())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|t| Value::String(t.to_rfc3339())),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|_| Value::String(format!("<{}>", type_name.to_lowercase())))
}
