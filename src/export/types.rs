// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use litefed_core::WorkspaceError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    /// Every table copied into one new database file
    MergedDatabase,
    /// Zip archive with one `<source>/<table>.csv` per table
    CsvBundle,
    /// Zip archive with one `<source>/<table>.json` per table
    JsonBundle,
}

impl ExportTarget {
    /// Entry extension inside a bundle archive
    pub fn entry_extension(&self) -> Option<&'static str> {
        match self {
            ExportTarget::MergedDatabase => None,
            ExportTarget::CsvBundle => Some("csv"),
            ExportTarget::JsonBundle => Some("json"),
        }
    }
}

impl FromStr for ExportTarget {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merged_database" | "merged" | "db" => Ok(ExportTarget::MergedDatabase),
            "csv_bundle" | "csv" => Ok(ExportTarget::CsvBundle),
            "json_bundle" | "json" => Ok(ExportTarget::JsonBundle),
            other => Err(WorkspaceError::validation(format!(
                "Unknown export target '{}'",
                other
            ))),
        }
    }
}

/// One table written by an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportedTable {
    pub source: String,
    pub table: String,
    /// Archive entry or merged table name
    pub destination: String,
    pub rows: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub target: ExportTarget,
    pub destination: PathBuf,
    pub tables: Vec<ExportedTable>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}
