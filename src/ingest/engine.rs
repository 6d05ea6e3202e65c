// SPDX-License-Identifier: Apache-2.0

//! Schema inference and transactional bulk load
//!
//! The first row of a dataframe decides the column list and types. The
//! destination table is dropped, recreated and filled inside a single
//! transaction: either the new table exists with every row, or the previous
//! state is left untouched.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::{debug, info, instrument};

use litefed_core::ident::{qualified_table, quote_ident};
use litefed_core::{Dataframe, Value, WorkspaceError, WorkspaceResult};

use crate::engine::sqlite::{bind_value, engine_error};

/// Storage type chosen for an inferred column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    /// Total mapping from a cell to a column type. Never fails.
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Int(_) | Value::Bool(_) => SqlType::Integer,
            Value::Float(_) => SqlType::Real,
            Value::Text(_)
            | Value::Bytes(_)
            | Value::Array(_)
            | Value::Object(_)
            | Value::Null => SqlType::Text,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredColumn {
    pub name: String,
    pub sql_type: SqlType,
}

/// What to do when a later row lacks a column of the inferred schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Store SQL NULL
    #[default]
    Null,
    /// Fail the whole ingestion with `MissingColumn`
    Reject,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    pub missing_columns: MissingColumnPolicy,
}

impl IngestOptions {
    pub fn strict() -> Self {
        Self {
            missing_columns: MissingColumnPolicy::Reject,
        }
    }
}

/// Derives the column list from the first row, skipping null fields.
pub fn infer_schema(dataframe: &Dataframe) -> WorkspaceResult<Vec<InferredColumn>> {
    let first = dataframe
        .first()
        .ok_or_else(|| WorkspaceError::empty_input("Dataframe has no rows"))?;

    let mut columns = Vec::with_capacity(first.len());
    for (name, value) in first.iter() {
        if value.is_null() {
            continue;
        }
        if name.trim().is_empty() {
            return Err(WorkspaceError::validation("Column names must not be empty"));
        }
        columns.push(InferredColumn {
            name: name.to_string(),
            sql_type: SqlType::for_value(value),
        });
    }

    if columns.is_empty() {
        return Err(WorkspaceError::no_schema(
            "First row has no non-null fields",
        ));
    }
    Ok(columns)
}

pub fn create_table_sql(target: &str, columns: &[InferredColumn]) -> String {
    let defs = columns
        .iter()
        .map(|col| format!("{} {}", quote_ident(&col.name), col.sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", target, defs)
}

fn insert_sql(target: &str, columns: &[InferredColumn]) -> String {
    let names = columns
        .iter()
        .map(|col| quote_ident(&col.name))
        .collect::<Vec<_>>()
        .join(", ");
    let params = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES ({})", target, names, params)
}

/// Replaces `schema.table` with the dataframe's rows. Returns rows written.
///
/// Row indices in `MissingColumn` errors are 0-based.
#[instrument(skip_all, fields(schema = ?schema, table = %table, rows = dataframe.len()))]
pub async fn ingest(
    conn: &mut SqliteConnection,
    dataframe: &Dataframe,
    schema: Option<&str>,
    table: &str,
    options: IngestOptions,
) -> WorkspaceResult<u64> {
    if table.trim().is_empty() {
        return Err(WorkspaceError::validation("Destination table name is required"));
    }
    let columns = infer_schema(dataframe)?;
    let target = qualified_table(schema, table);
    let start = Instant::now();

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| engine_error(e, "BEGIN"))?;

    let drop_sql = format!("DROP TABLE IF EXISTS {}", target);
    sqlx::query(&drop_sql)
        .persistent(false)
        .execute(&mut *tx)
        .await
        .map_err(|e| engine_error(e, &drop_sql))?;

    let create_sql = create_table_sql(&target, &columns);
    debug!(sql = %create_sql, "Creating destination table");
    sqlx::query(&create_sql)
        .persistent(false)
        .execute(&mut *tx)
        .await
        .map_err(|e| engine_error(e, &create_sql))?;

    let insert = insert_sql(&target, &columns);
    let mut written = 0u64;
    for (row_idx, row) in dataframe.rows().iter().enumerate() {
        let mut query = sqlx::query(&insert);
        for col in &columns {
            let value = match row.get(&col.name) {
                Some(value) => value,
                None if options.missing_columns == MissingColumnPolicy::Reject => {
                    return Err(WorkspaceError::missing_column(&col.name, row_idx));
                }
                None => &Value::Null,
            };
            query = bind_value(query, value);
        }
        let result = query
            .execute(&mut *tx)
            .await
            .map_err(|e| engine_error(e, &insert))?;
        written += result.rows_affected();
    }

    tx.commit().await.map_err(|e| engine_error(e, "COMMIT"))?;

    info!(
        rows = written,
        columns = columns.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Ingestion completed"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use litefed_core::Record;
    use serde_json::json;

    #[test]
    fn type_mapping_is_total() {
        assert_eq!(SqlType::for_value(&Value::Int(1)), SqlType::Integer);
        assert_eq!(SqlType::for_value(&Value::Bool(false)), SqlType::Integer);
        assert_eq!(SqlType::for_value(&Value::Float(0.5)), SqlType::Real);
        assert_eq!(SqlType::for_value(&Value::from("x")), SqlType::Text);
        assert_eq!(SqlType::for_value(&Value::from(json!([1]))), SqlType::Text);
        assert_eq!(SqlType::for_value(&Value::from(json!({"a": 1}))), SqlType::Text);
        assert_eq!(SqlType::for_value(&Value::Null), SqlType::Text);
        assert_eq!(SqlType::for_value(&Value::Bytes(vec![0])), SqlType::Text);
    }

    #[test]
    fn inference_uses_first_row_only_and_skips_nulls() {
        let df = Dataframe::from_rows(vec![
            Record::new()
                .with("id", 1i64)
                .with("note", Value::Null)
                .with("score", 1.5),
            Record::new().with("id", "not a number").with("extra", true),
        ]);
        let columns = infer_schema(&df).unwrap();
        assert_eq!(
            columns,
            vec![
                InferredColumn { name: "id".into(), sql_type: SqlType::Integer },
                InferredColumn { name: "score".into(), sql_type: SqlType::Real },
            ]
        );
    }

    #[test]
    fn empty_and_all_null_inputs_are_rejected() {
        assert!(matches!(
            infer_schema(&Dataframe::new()),
            Err(WorkspaceError::EmptyInput { .. })
        ));
        let all_null = Dataframe::from_rows(vec![Record::new().with("a", Value::Null)]);
        assert!(matches!(
            infer_schema(&all_null),
            Err(WorkspaceError::NoSchema { .. })
        ));
    }

    #[test]
    fn generated_sql_quotes_identifiers() {
        let columns = vec![
            InferredColumn { name: "first name".into(), sql_type: SqlType::Text },
            InferredColumn { name: "n".into(), sql_type: SqlType::Integer },
        ];
        assert_eq!(
            create_table_sql("\"s\".\"t\"", &columns),
            "CREATE TABLE \"s\".\"t\" (\"first name\" TEXT, \"n\" INTEGER)"
        );
        assert_eq!(
            insert_sql("\"t\"", &columns),
            "INSERT INTO \"t\" (\"first name\", \"n\") VALUES (?1, ?2)"
        );
    }
}
