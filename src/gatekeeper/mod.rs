// SPDX-License-Identifier: Apache-2.0

//! Query Gatekeeper
//!
//! Every piece of user SQL goes through [`run`]: the text is normalized,
//! screened for ATTACH/DETACH when the session is locked, classified by its
//! first keyword and executed on the read or write path. Read results carry
//! the primary-key columns that make their cells editable.

pub mod classify;
pub mod keys;

use std::time::Instant;

use serde::Deserialize;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, instrument, warn};

use litefed_core::ident::{qualified_table, quote_ident};
use litefed_core::{Value, WorkspaceError, WorkspaceResult};

use crate::engine::sqlite::{self, bind_value, engine_error};
use crate::engine::types::{QueryOutcome, ResultSet};
use crate::metrics;

pub use classify::{classify, contains_attach_or_detach, leading_keyword, normalize, StatementKind};
pub use keys::{discover_key_columns, extract_from_table, TableRef};

/// Classifies, screens and runs user SQL.
#[instrument(skip_all, fields(len = sql.len(), editable = editable_requested, locked = locked))]
pub async fn run(
    conn: &mut SqliteConnection,
    sql: &str,
    editable_requested: bool,
    locked: bool,
) -> WorkspaceResult<QueryOutcome> {
    let normalized = normalize(sql);
    if normalized.is_empty() {
        return Err(WorkspaceError::validation("Query is empty"));
    }

    if locked && contains_attach_or_detach(&normalized) {
        metrics::record_forbidden();
        warn!("Refused ATTACH/DETACH while locked");
        return Err(WorkspaceError::forbidden(
            "ATTACH and DETACH are not allowed in this session",
        ));
    }

    let start = Instant::now();
    let outcome = match classify(&normalized) {
        StatementKind::Read => read_path(conn, &normalized, editable_requested).await,
        StatementKind::Write => sqlite::execute(conn, &normalized)
            .await
            .map(|(rows_affected, execution_time_ms)| QueryOutcome::Affected {
                rows_affected,
                execution_time_ms,
            }),
    };
    metrics::record_statement(start.elapsed(), outcome.is_ok());
    outcome
}

async fn read_path(
    conn: &mut SqliteConnection,
    sql: &str,
    editable_requested: bool,
) -> WorkspaceResult<QueryOutcome> {
    let (columns, rows, execution_time_ms) = sqlite::fetch_rows(conn, sql).await?;

    let mut result = ResultSet {
        columns,
        rows,
        key_columns: Vec::new(),
        source_table: None,
        editable: false,
        execution_time_ms,
    };

    if editable_requested {
        if let Some(source) = extract_from_table(sql) {
            match discover_key_columns(conn, source.schema.as_deref(), &source.table).await {
                Ok(keys) if !keys.is_empty() => {
                    let present = keys::keys_present(sql, &keys);
                    result.editable = present.len() == keys.len();
                    result.key_columns = present;
                    result.source_table = Some(source.table);
                }
                Ok(_) => debug!(table = %source.table, "No key columns found"),
                Err(e) => debug!(table = %source.table, error = %e, "Key discovery failed"),
            }
        }
    }

    Ok(QueryOutcome::Rows(result))
}

/// `SELECT * FROM <database>.<table> LIMIT <limit>` through the read path.
/// Without a database the table is looked up unqualified.
pub async fn browse_table(
    conn: &mut SqliteConnection,
    database: Option<&str>,
    table: &str,
    limit: u32,
) -> WorkspaceResult<QueryOutcome> {
    if table.trim().is_empty() {
        return Err(WorkspaceError::validation("Table name is required"));
    }
    let sql = format!("SELECT * FROM {} LIMIT {}", qualified_table(database, table), limit);
    run(conn, &sql, true, true).await
}

/// One cell edit addressed by key
#[derive(Debug, Clone, Deserialize)]
pub struct CellUpdate {
    /// Target database; defaults to the current-database pointer
    #[serde(default)]
    pub database: Option<String>,
    pub table: String,
    /// Key column/value pairs identifying the row
    pub keys: Vec<(String, Value)>,
    pub column: String,
    pub value: Value,
}

/// Updates one cell. Every key column of the table must be supplied.
pub async fn update_cell(
    conn: &mut SqliteConnection,
    database: Option<&str>,
    request: &CellUpdate,
) -> WorkspaceResult<u64> {
    if request.table.trim().is_empty() || request.column.trim().is_empty() {
        return Err(WorkspaceError::validation("Table and column are required"));
    }
    if request.keys.is_empty() {
        return Err(WorkspaceError::validation("At least one key column is required"));
    }

    let table_keys = discover_key_columns(conn, database, &request.table).await?;
    if table_keys.is_empty() {
        return Err(WorkspaceError::validation(format!(
            "Table '{}' has no key columns; its cells are not editable",
            request.table
        )));
    }
    for (key, _) in &request.keys {
        if !table_keys.iter().any(|k| k == key) {
            return Err(WorkspaceError::validation(format!(
                "'{}' is not a key column of '{}'",
                key, request.table
            )));
        }
    }
    if let Some(missing) = table_keys
        .iter()
        .find(|k| !request.keys.iter().any(|(key, _)| key == *k))
    {
        return Err(WorkspaceError::validation(format!(
            "Key column '{}' is required",
            missing
        )));
    }

    let columns = sqlite::table_columns(conn, database, &request.table).await?;
    if !columns.iter().any(|col| col.name == request.column) {
        return Err(WorkspaceError::validation(format!(
            "Unknown column '{}'",
            request.column
        )));
    }

    let predicates = request
        .keys
        .iter()
        .enumerate()
        .map(|(i, (key, _))| format!("{} = ?{}", quote_ident(key), i + 2))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "UPDATE {} SET {} = ?1 WHERE {}",
        qualified_table(database, &request.table),
        quote_ident(&request.column),
        predicates
    );

    let mut query = bind_value(sqlx::query(&sql).persistent(false), &request.value);
    for (_, value) in &request.keys {
        query = bind_value(query, value);
    }
    let result = query
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sqlite::{execute_script, open_primary};
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, SqliteConnection) {
        let dir = tempdir().unwrap();
        let mut conn = open_primary(&dir.path().join("primary.db")).await.unwrap();
        execute_script(
            &mut conn,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO users (name) VALUES ('Alice'), ('Bob');",
        )
        .await
        .unwrap();
        (dir, conn)
    }

    #[tokio::test]
    async fn empty_sql_is_validation_error() {
        let (_dir, mut conn) = setup().await;
        assert!(matches!(
            run(&mut conn, " ; ;", false, true).await,
            Err(WorkspaceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn explicit_columns_without_key_are_not_editable() {
        let (_dir, mut conn) = setup().await;
        let outcome = run(&mut conn, "SELECT name FROM users", true, true).await.unwrap();
        let rows = outcome.rows().unwrap();
        assert_eq!(rows.rows.len(), 2);
        assert!(rows.key_columns.is_empty());
        assert!(!rows.editable);
    }

    #[tokio::test]
    async fn editable_not_requested_skips_discovery() {
        let (_dir, mut conn) = setup().await;
        let outcome = run(&mut conn, "SELECT * FROM users", false, true).await.unwrap();
        assert!(outcome.rows().unwrap().key_columns.is_empty());
    }

    #[tokio::test]
    async fn update_cell_requires_full_key() {
        let (_dir, mut conn) = setup().await;
        let mut request = CellUpdate {
            database: None,
            table: "users".into(),
            keys: vec![("name".into(), Value::from("Alice"))],
            column: "name".into(),
            value: Value::from("Alicia"),
        };
        assert!(matches!(
            update_cell(&mut conn, None, &request).await,
            Err(WorkspaceError::Validation { .. })
        ));

        request.keys = vec![("id".into(), Value::Int(1))];
        assert_eq!(update_cell(&mut conn, None, &request).await.unwrap(), 1);

        request.column = "nope".into();
        assert!(update_cell(&mut conn, None, &request).await.is_err());
    }
}
