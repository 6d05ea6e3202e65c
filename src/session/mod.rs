// SPDX-License-Identifier: Apache-2.0

//! Session Manager
//!
//! Owns the one connection every schema of the federation is attached to,
//! and keeps the live attachment set in step with the catalog.

pub mod manager;
pub mod scan;

use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::CatalogEntry;

pub use manager::WorkspaceSession;

/// A file that could not be attached while opening a workspace
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of opening a workspace root
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub root: String,
    /// Logical names attached after reconciliation
    pub attached: Vec<String>,
    /// Files found by the scan and newly cataloged
    pub discovered: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Result of loading a data file into a new database
#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub database: CatalogEntry,
    /// Tables written, with their row counts
    pub tables: Vec<(String, u64)>,
    /// Rows affected by a SQL script, when the file was one
    pub script_rows: Option<u64>,
}
