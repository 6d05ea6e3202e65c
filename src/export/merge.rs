// SPDX-License-Identifier: Apache-2.0

//! Copies every source table into one freshly created database file.

use std::collections::HashSet;
use std::path::Path;

use futures::TryStreamExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::{debug, error, instrument};

use litefed_core::ident::{qualified_table, quote_ident, sanitize_identifier, with_suffix};
use litefed_core::{WorkspaceError, WorkspaceResult};

use crate::engine::sqlite::{self, bind_value, convert_row, engine_error};
use crate::engine::types::TableColumn;
use crate::export::types::ExportedTable;
use crate::session::manager::remove_database_file;

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `<source>_<table>`, sanitized and made unique among `taken`.
pub fn merged_table_name(source: &str, table: &str, taken: &mut HashSet<String>) -> WorkspaceResult<String> {
    let base = sanitize_identifier(&format!("{}_{}", source, table));
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = with_suffix(&base, attempt);
        if taken.insert(candidate.to_ascii_lowercase()) {
            return Ok(candidate);
        }
    }
    Err(WorkspaceError::resource_exhausted(format!(
        "No free table name for {}",
        base
    )))
}

/// DDL for a copied table: declared types, NOT NULL and the primary key.
pub fn create_table_sql(name: &str, columns: &[TableColumn]) -> String {
    let mut keys: Vec<&TableColumn> = columns.iter().filter(|c| c.is_primary_key()).collect();
    keys.sort_by_key(|c| c.primary_key_position);
    let single_key = keys.len() == 1;

    let mut defs: Vec<String> = columns
        .iter()
        .map(|col| {
            let mut def = quote_ident(&col.name);
            if !col.data_type.trim().is_empty() {
                def.push(' ');
                def.push_str(col.data_type.trim());
            }
            if single_key && col.is_primary_key() {
                def.push_str(" PRIMARY KEY");
            }
            if col.not_null {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    if keys.len() > 1 {
        let key_list = keys
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        defs.push(format!("PRIMARY KEY ({})", key_list));
    }

    format!("CREATE TABLE {} ({})", quote_ident(name), defs.join(", "))
}

/// Recreates `destination` and copies each table in its own transaction.
#[instrument(skip(conn, tables), fields(tables = tables.len(), destination = %destination.display()))]
pub async fn merge_into(
    conn: &mut SqliteConnection,
    tables: &[(String, String)],
    destination: &Path,
) -> WorkspaceResult<Vec<ExportedTable>> {
    remove_database_file(destination).map_err(|e| {
        WorkspaceError::io(format!("Failed to replace {}: {}", destination.display(), e))
    })?;
    let mut dest = sqlite::open_file(destination).await?;

    let result = copy_tables(conn, &mut dest, tables).await;
    if let Err(e) = sqlite::close(dest).await {
        error!(error = %e, "Failed to close merged database");
    }
    result
}

async fn copy_tables(
    conn: &mut SqliteConnection,
    dest: &mut SqliteConnection,
    tables: &[(String, String)],
) -> WorkspaceResult<Vec<ExportedTable>> {
    let mut taken = HashSet::new();
    let mut exported = Vec::with_capacity(tables.len());
    for (source, table) in tables {
        let name = merged_table_name(source, table, &mut taken)?;
        let rows = copy_table(conn, dest, source, table, &name).await?;
        debug!(source = %source, table = %table, merged = %name, rows, "Table merged");
        exported.push(ExportedTable {
            source: source.clone(),
            table: table.clone(),
            destination: name,
            rows,
        });
    }
    Ok(exported)
}

async fn copy_table(
    conn: &mut SqliteConnection,
    dest: &mut SqliteConnection,
    source: &str,
    table: &str,
    name: &str,
) -> WorkspaceResult<u64> {
    let columns = sqlite::table_columns(conn, Some(source), table).await?;
    if columns.is_empty() {
        return Err(WorkspaceError::not_found(format!("Table {}.{}", source, table)));
    }

    let ddl = create_table_sql(name, &columns);
    let column_list = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        column_list,
        placeholders
    );
    let select = format!(
        "SELECT {} FROM {}",
        column_list,
        qualified_table(Some(source), table)
    );

    let mut tx = dest.begin().await.map_err(|e| engine_error(e, "BEGIN"))?;
    sqlx::query(&ddl)
        .execute(&mut *tx)
        .await
        .map_err(|e| engine_error(e, &ddl))?;

    let mut count = 0u64;
    let mut rows = sqlx::query(&select).persistent(false).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await.map_err(|e| engine_error(e, &select))? {
        let row = convert_row(&row);
        let mut query = sqlx::query(&insert);
        for value in &row.values {
            query = bind_value(query, value);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| engine_error(e, &insert))?;
        count += 1;
    }
    drop(rows);

    tx.commit().await.map_err(|e| engine_error(e, "COMMIT"))?;
    Ok(count)
}
