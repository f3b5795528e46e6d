//! Table definitions for prompt injection

use serde::{Deserialize, Serialize};

/// One column as reported by `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Render columns as `CREATE TABLE` statements, one per table.
///
/// Columns must arrive grouped by table (ordered by table, then ordinal
/// position); a table name seen again later starts a new statement.
pub fn format_table_definitions(columns: &[ColumnInfo]) -> String {
    let mut statements: Vec<String> = Vec::new();
    let mut current: Option<&str> = None;
    let mut lines: Vec<String> = Vec::new();

    for column in columns {
        if current != Some(column.table_name.as_str()) {
            if let Some(table) = current {
                statements.push(create_table(table, &lines));
                lines.clear();
            }
            current = Some(column.table_name.as_str());
        }
        let not_null = if column.nullable { "" } else { " NOT NULL" };
        lines.push(format!(
            "    {} {}{}",
            column.column_name, column.data_type, not_null
        ));
    }

    if let Some(table) = current {
        statements.push(create_table(table, &lines));
    }

    statements.join("\n\n")
}

fn create_table(table: &str, lines: &[String]) -> String {
    format!("CREATE TABLE {} (\n{}\n);", table, lines.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_table() {
        let columns = vec![
            ColumnInfo::new("sales", "id", "integer", false),
            ColumnInfo::new("sales", "amount", "numeric", true),
            ColumnInfo::new("sales", "date", "date", true),
        ];
        assert_eq!(
            format_table_definitions(&columns),
            "CREATE TABLE sales (\n    id integer NOT NULL,\n    amount numeric,\n    date date\n);"
        );
    }

    #[test]
    fn test_multiple_tables() {
        let columns = vec![
            ColumnInfo::new("customers", "id", "integer", false),
            ColumnInfo::new("orders", "id", "integer", false),
            ColumnInfo::new("orders", "customer_id", "integer", true),
        ];
        let text = format_table_definitions(&columns);
        assert_eq!(text.matches("CREATE TABLE").count(), 2);
        assert!(text.contains("CREATE TABLE orders (\n    id integer NOT NULL,\n    customer_id integer\n);"));
    }

    #[test]
    fn test_empty_schema() {
        assert_eq!(format_table_definitions(&[]), "");
    }
}
