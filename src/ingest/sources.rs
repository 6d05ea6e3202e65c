// SPDX-License-Identifier: Apache-2.0

//! Data-file readers
//!
//! Turn CSV and JSON files into dataframes, and SQL files into scripts, so
//! they can be loaded into a fresh database.

use std::path::Path;

use litefed_core::ident::{file_extension, logical_name, sanitize_identifier, with_suffix};
use litefed_core::{Dataframe, Record, Value, WorkspaceError, WorkspaceResult};
use tracing::warn;

/// Recognized data-file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFileKind {
    Csv,
    Json,
    Sql,
}

impl DataFileKind {
    pub fn from_path(path: &Path) -> WorkspaceResult<Self> {
        match file_extension(path).as_deref() {
            Some(".csv") => Ok(DataFileKind::Csv),
            Some(".json") => Ok(DataFileKind::Json),
            Some(".sql") => Ok(DataFileKind::Sql),
            other => Err(WorkspaceError::validation(format!(
                "Unsupported data file type: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Parsed contents of a data file
#[derive(Debug, Clone)]
pub enum DataFile {
    /// Named tables to ingest, in file order
    Tables(Vec<(String, Dataframe)>),
    /// SQL text to execute as-is
    Script(String),
}

/// Reads and parses a data file. The file stem names single-table inputs.
pub async fn read_data_file(path: &Path) -> WorkspaceResult<DataFile> {
    let kind = DataFileKind::from_path(path)?;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        WorkspaceError::io(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let table = default_table_name(path);

    match kind {
        DataFileKind::Csv => Ok(DataFile::Tables(vec![(table, parse_csv(bytes.as_slice())?)])),
        DataFileKind::Json => Ok(DataFile::Tables(parse_json(&bytes, &table)?)),
        DataFileKind::Sql => String::from_utf8(bytes)
            .map(DataFile::Script)
            .map_err(|e| WorkspaceError::validation(format!("SQL file is not UTF-8: {}", e))),
    }
}

pub fn default_table_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    logical_name(file_name)
}

/// Types a CSV cell: booleans, then integers, then finite floats, else text.
pub fn type_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    Value::Text(raw.to_string())
}

/// Sanitized, de-duplicated header names.
fn header_names(headers: &csv::StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let base = sanitize_identifier(header);
        let mut attempt = 0;
        let mut name = base.clone();
        while names.contains(&name) {
            attempt += 1;
            name = with_suffix(&base, attempt);
        }
        names.push(name);
    }
    names
}

pub fn parse_csv<R: std::io::Read>(reader: R) -> WorkspaceResult<Dataframe> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| WorkspaceError::validation(format!("Invalid CSV header: {}", e)))?
        .clone();
    let names = header_names(&headers);

    let mut dataframe = Dataframe::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| WorkspaceError::validation(format!("Invalid CSV record: {}", e)))?;
        let mut row = Record::new();
        for (name, field) in names.iter().zip(record.iter()) {
            row.insert(name.clone(), type_cell(field));
        }
        dataframe.push(row);
    }
    Ok(dataframe)
}

fn row_from_json(value: serde_json::Value) -> Option<Record> {
    match value {
        serde_json::Value::Object(map) => Some(Record::from(map)),
        _ => None,
    }
}

/// Accepts either `{table: [rows...]}` or a top-level `[rows...]` named `default_table`.
pub fn parse_json(bytes: &[u8], default_table: &str) -> WorkspaceResult<Vec<(String, Dataframe)>> {
    let document: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| WorkspaceError::validation(format!("Invalid JSON: {}", e)))?;

    match document {
        serde_json::Value::Object(tables) => {
            let mut out = Vec::with_capacity(tables.len());
            for (table, rows) in tables {
                let serde_json::Value::Array(rows) = rows else {
                    return Err(WorkspaceError::validation(format!(
                        "Table '{}' must be an array of objects",
                        table
                    )));
                };
                let mut dataframe = Dataframe::new();
                for (idx, row) in rows.into_iter().enumerate() {
                    let record = row_from_json(row).ok_or_else(|| {
                        WorkspaceError::validation(format!(
                            "Row {} of table '{}' is not an object",
                            idx, table
                        ))
                    })?;
                    dataframe.push(record);
                }
                out.push((sanitize_identifier(&table), dataframe));
            }
            Ok(out)
        }
        serde_json::Value::Array(rows) => {
            let mut dataframe = Dataframe::new();
            for (idx, row) in rows.into_iter().enumerate() {
                match row_from_json(row) {
                    Some(record) => dataframe.push(record),
                    None => warn!(row = idx, "Skipping non-object JSON row"),
                }
            }
            Ok(vec![(default_table.to_string(), dataframe)])
        }
        _ => Err(WorkspaceError::validation(
            "JSON must be an object of tables or an array of rows",
        )),
    }
}
