// SPDX-License-Identifier: Apache-2.0

//! Export pipeline
//!
//! Walks every source schema, streams each table row by row and hands the
//! rows to a bundle writer or to the merged-database copier. A failure stops
//! the export at that table; anything already written stays on disk.

use std::fs::File;
use std::path::Path;

use futures::TryStreamExt;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use litefed_core::ident::qualified_table;
use litefed_core::{WorkspaceError, WorkspaceResult};

use crate::catalog::is_bookkeeping_table;
use crate::engine::sqlite::{self, convert_row, engine_error};
use crate::engine::types::ColumnInfo;
use crate::export::merge;
use crate::export::types::{ExportSummary, ExportTarget, ExportedTable};
use crate::export::writers::{create_writer, TableWriter};

/// User tables of each source, bookkeeping tables of `main` excluded.
pub async fn source_tables(
    conn: &mut SqliteConnection,
    sources: &[String],
) -> WorkspaceResult<Vec<(String, String)>> {
    let mut tables = Vec::new();
    for source in sources {
        for table in sqlite::list_tables(conn, source).await? {
            if source == "main" && is_bookkeeping_table(&table) {
                continue;
            }
            tables.push((source.clone(), table));
        }
    }
    Ok(tables)
}

/// Exports every table of `sources` to `destination`.
#[instrument(skip(conn, sources), fields(sources = sources.len()))]
pub async fn export_all(
    conn: &mut SqliteConnection,
    sources: &[String],
    target: ExportTarget,
    destination: &Path,
) -> WorkspaceResult<ExportSummary> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tables = source_tables(conn, sources).await?;

    let exported = match target {
        ExportTarget::MergedDatabase => merge::merge_into(conn, &tables, destination).await?,
        ExportTarget::CsvBundle | ExportTarget::JsonBundle => {
            write_bundle(conn, &tables, target, destination).await?
        }
    };

    let summary = ExportSummary {
        target,
        destination: destination.to_path_buf(),
        tables: exported,
    };
    info!(
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        "Export finished"
    );
    Ok(summary)
}

fn zip_error(err: zip::result::ZipError) -> WorkspaceError {
    WorkspaceError::io(format!("Archive write failed: {}", err))
}

/// Archive entry name; path separators inside names are folded away.
pub fn entry_name(source: &str, table: &str, extension: &str) -> String {
    let clean = |part: &str| part.replace(['/', '\\'], "_");
    format!("{}/{}.{}", clean(source), clean(table), extension)
}

async fn write_bundle(
    conn: &mut SqliteConnection,
    tables: &[(String, String)],
    target: ExportTarget,
    destination: &Path,
) -> WorkspaceResult<Vec<ExportedTable>> {
    let extension = target
        .entry_extension()
        .ok_or_else(|| WorkspaceError::validation("Not a bundle export target"))?;
    let file = File::create(destination)
        .map_err(|e| WorkspaceError::io(format!("Failed to create {}: {}", destination.display(), e)))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut exported = Vec::with_capacity(tables.len());
    for (source, table) in tables {
        let entry = entry_name(source, table, extension);
        zip.start_file(entry.as_str(), options).map_err(zip_error)?;

        let rows = {
            let mut writer = create_writer(target, &mut zip)
                .ok_or_else(|| WorkspaceError::validation("Not a bundle export target"))?;
            stream_table(conn, source, table, writer.as_mut()).await?
        };
        debug!(entry = %entry, rows, "Archive entry written");
        exported.push(ExportedTable {
            source: source.clone(),
            table: table.clone(),
            destination: entry,
            rows,
        });
    }

    zip.finish().map_err(zip_error)?;
    Ok(exported)
}

/// Streams one table through a writer and returns the rows written.
pub async fn stream_table(
    conn: &mut SqliteConnection,
    source: &str,
    table: &str,
    writer: &mut dyn TableWriter,
) -> WorkspaceResult<u64> {
    let columns: Vec<ColumnInfo> = sqlite::table_columns(conn, Some(source), table)
        .await?
        .iter()
        .map(ColumnInfo::from)
        .collect();
    writer.write_header(&columns)?;

    let sql = format!("SELECT * FROM {}", qualified_table(Some(source), table));
    let mut rows = sqlx::query(&sql).persistent(false).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await.map_err(|e| engine_error(e, &sql))? {
        writer.write_row(&columns, &convert_row(&row))?;
    }
    drop(rows);

    writer.finish()?;
    Ok(writer.rows_written())
}
