// SPDX-License-Identifier: Apache-2.0

//! SQLite access helpers
//!
//! Thin functions over a single `sqlx::SqliteConnection`. Every schema the
//! federation exposes is attached to that one connection, so nothing here
//! uses a pool.
//!
//! ## SQLite Specifics
//!
//! - Values are read by their storage class, not the declared column type,
//!   so an untyped column holding an integer comes back as `Value::Int`.
//! - The primary file runs in WAL mode with a 30s busy timeout.
//! - Statements that do not run to completion are kept non-persistent so
//!   they cannot hold a schema lock that would block a later DETACH.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteColumn, SqliteConnectOptions, SqliteConnection,
    SqliteJournalMode, SqliteRow,
};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::debug;

use litefed_core::ident::quote_ident;
use litefed_core::{Value, WorkspaceError, WorkspaceResult};

use crate::engine::types::{ColumnInfo, LiveDatabase, Row as QRow, TableColumn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Journal mode requested for a newly created database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Leave SQLite's rollback journal in place
    #[default]
    Delete,
    Wal,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
        }
    }
}

impl FromStr for JournalMode {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "delete" | "default" => Ok(JournalMode::Delete),
            "wal" => Ok(JournalMode::Wal),
            other => Err(WorkspaceError::validation(format!(
                "Unsupported journal mode: {}",
                other
            ))),
        }
    }
}

fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT)
}

/// Opens the session connection on the primary file, creating it if needed.
pub async fn open_primary(path: &Path) -> WorkspaceResult<SqliteConnection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let options = connect_options(path).journal_mode(SqliteJournalMode::Wal);
    SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| connection_error(e, path))
}

/// Opens a short-lived connection on a standalone database file.
pub async fn open_file(path: &Path) -> WorkspaceResult<SqliteConnection> {
    SqliteConnection::connect_with(&connect_options(path))
        .await
        .map_err(|e| connection_error(e, path))
}

pub async fn close(conn: SqliteConnection) -> WorkspaceResult<()> {
    conn.close()
        .await
        .map_err(|e| WorkspaceError::engine(describe(&e)))
}

fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

/// Maps a driver error, keeping the statement for diagnostics.
pub fn engine_error(err: sqlx::Error, statement: &str) -> WorkspaceError {
    WorkspaceError::engine_with_statement(describe(&err), statement)
}

fn connection_error(err: sqlx::Error, path: &Path) -> WorkspaceError {
    WorkspaceError::engine(format!(
        "Failed to open {}: {}",
        path.display(),
        describe(&err)
    ))
}

/// Binds an owned copy of a value. Booleans become 0/1 and composite values
/// are stored as their JSON text.
pub fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(i64::from(*b)),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_json_text()),
    }
}

/// Converts a SQLx row to our universal Row type
pub fn convert_row(sqlite_row: &SqliteRow) -> QRow {
    let values = sqlite_row
        .columns()
        .iter()
        .map(|col| extract_value(sqlite_row, col.ordinal()))
        .collect();

    QRow { values }
}

/// Reads a cell by its storage class.
pub fn extract_value(row: &SqliteRow, idx: usize) -> Value {
    let storage_class = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(idx).map(Value::Int),
        "REAL" | "NUMERIC" => row.try_get_unchecked::<f64, _>(idx).map(Value::Float),
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(idx).map(Value::Bytes),
        _ => row.try_get_unchecked::<String, _>(idx).map(Value::Text),
    };

    value.unwrap_or(Value::Null)
}

pub fn column_info(columns: &[SqliteColumn]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| ColumnInfo {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

/// Runs a statement that returns rows and converts all of them.
pub async fn fetch_rows(
    conn: &mut SqliteConnection,
    sql: &str,
) -> WorkspaceResult<(Vec<ColumnInfo>, Vec<QRow>, f64)> {
    let start = Instant::now();
    let sqlite_rows: Vec<SqliteRow> = sqlx::query(sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

    let columns = match sqlite_rows.first() {
        Some(row) => column_info(row.columns()),
        None => describe_columns(conn, sql).await,
    };
    let rows = sqlite_rows.iter().map(convert_row).collect();

    Ok((columns, rows, execution_time_ms))
}

/// Result columns of a statement that produced no rows.
async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<ColumnInfo> {
    match (&mut *conn).describe(sql).await {
        Ok(described) => column_info(described.columns()),
        Err(e) => {
            debug!(error = %e, "Could not describe result columns");
            Vec::new()
        }
    }
}

/// Runs a statement (or a `;`-separated batch) and returns rows affected.
pub async fn execute(conn: &mut SqliteConnection, sql: &str) -> WorkspaceResult<(u64, f64)> {
    let start = Instant::now();
    let result = sqlx::raw_sql(sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

    Ok((result.rows_affected(), execution_time_ms))
}

/// Runs a SQL script verbatim, statement by statement.
pub async fn execute_script(conn: &mut SqliteConnection, script: &str) -> WorkspaceResult<u64> {
    let result = sqlx::raw_sql(script)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, script))?;
    Ok(result.rows_affected())
}

pub async fn attach(conn: &mut SqliteConnection, alias: &str, path: &Path) -> WorkspaceResult<()> {
    let sql = format!("ATTACH DATABASE ?1 AS {}", quote_ident(alias));
    sqlx::query(&sql)
        .persistent(false)
        .bind(path.to_string_lossy().into_owned())
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(())
}

pub async fn detach(conn: &mut SqliteConnection, alias: &str) -> WorkspaceResult<()> {
    let sql = format!("DETACH DATABASE {}", quote_ident(alias));
    sqlx::query(&sql)
        .persistent(false)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(())
}

/// Forces SQLite to read the schema, which fails for files that are not databases.
pub async fn probe_schema(conn: &mut SqliteConnection, alias: &str) -> WorkspaceResult<i64> {
    let sql = format!("SELECT count(*) FROM {}.sqlite_master", quote_ident(alias));
    sqlx::query_scalar::<_, i64>(&sql)
        .persistent(false)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))
}

pub async fn set_journal_mode(
    conn: &mut SqliteConnection,
    schema: &str,
    mode: JournalMode,
) -> WorkspaceResult<()> {
    let sql = format!(
        "PRAGMA {}.journal_mode = {}",
        quote_ident(schema),
        mode.as_pragma()
    );
    sqlx::query(&sql)
        .persistent(false)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(())
}

/// Every schema attached to the connection, `main` first.
pub async fn database_list(conn: &mut SqliteConnection) -> WorkspaceResult<Vec<LiveDatabase>> {
    let sql = "SELECT name, file FROM pragma_database_list ORDER BY seq";
    let rows: Vec<SqliteRow> = sqlx::query(sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;

    rows.iter()
        .map(|row| {
            Ok(LiveDatabase {
                name: row.try_get("name").map_err(|e| engine_error(e, sql))?,
                file: row
                    .try_get::<Option<String>, _>("file")
                    .map_err(|e| engine_error(e, sql))?
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// User tables of a schema, in name order.
pub async fn list_tables(conn: &mut SqliteConnection, schema: &str) -> WorkspaceResult<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        quote_ident(schema)
    );
    sqlx::query_scalar::<_, String>(&sql)
        .persistent(false)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))
}

/// Table-valued pragma call, scoped to a schema when one is given.
pub fn pragma_call(pragma: &str, schema: Option<&str>) -> String {
    match schema {
        Some(_) => format!("pragma_{}(?1, ?2)", pragma),
        None => format!("pragma_{}(?1)", pragma),
    }
}

/// Column definitions; an unqualified table resolves the way SQLite does.
pub async fn table_columns(
    conn: &mut SqliteConnection,
    schema: Option<&str>,
    table: &str,
) -> WorkspaceResult<Vec<TableColumn>> {
    let sql = format!(
        r#"SELECT name, type, "notnull", dflt_value, pk FROM {} ORDER BY cid"#,
        pragma_call("table_info", schema)
    );
    let sql = sql.as_str();
    let mut query = sqlx::query(sql).bind(table);
    if let Some(schema) = schema {
        query = query.bind(schema);
    }
    let rows: Vec<SqliteRow> = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;

    rows.iter()
        .map(|row| {
            Ok(TableColumn {
                name: row.try_get("name").map_err(|e| engine_error(e, sql))?,
                data_type: row
                    .try_get::<Option<String>, _>("type")
                    .map_err(|e| engine_error(e, sql))?
                    .unwrap_or_default(),
                not_null: row
                    .try_get::<i64, _>("notnull")
                    .map_err(|e| engine_error(e, sql))?
                    != 0,
                default_value: row
                    .try_get::<Option<String>, _>("dflt_value")
                    .map_err(|e| engine_error(e, sql))?,
                primary_key_position: row.try_get("pk").map_err(|e| engine_error(e, sql))?,
            })
        })
        .collect()
}
