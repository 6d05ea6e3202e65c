// SPDX-License-Identifier: Apache-2.0

//! Catalog of attached databases
//!
//! The catalog lives in two bookkeeping tables of the primary file: `dbs`
//! maps logical names to physical paths per workspace root, and
//! `current_db` holds the single current-database pointer.

pub mod store;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use litefed_core::{WorkspaceError, WorkspaceResult};

/// Tables of the primary schema that belong to the catalog itself.
pub const BOOKKEEPING_TABLES: [&str; 2] = ["dbs", "current_db"];

const MAIN_ROOT_KEY: &str = "main";

/// One attached database file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub path: PathBuf,
    pub root: String,
    pub app_created: bool,
    pub created_at: NaiveDateTime,
}

/// Scope of the catalog: the application's own storage or a user directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkspaceRoot {
    #[default]
    Main,
    Directory(PathBuf),
}

impl WorkspaceRoot {
    /// Resolves a user-chosen directory. It must exist.
    pub fn directory(path: impl AsRef<Path>) -> WorkspaceResult<Self> {
        let path = path.as_ref();
        let canonical = path.canonicalize().map_err(|e| {
            WorkspaceError::not_found(format!("Workspace root {}: {}", path.display(), e))
        })?;
        if !canonical.is_dir() {
            return Err(WorkspaceError::validation(format!(
                "Workspace root is not a directory: {}",
                canonical.display()
            )));
        }
        Ok(Self::Directory(canonical))
    }

    /// Value stored in the `root` column.
    pub fn key(&self) -> String {
        match self {
            WorkspaceRoot::Main => MAIN_ROOT_KEY.to_string(),
            WorkspaceRoot::Directory(path) => path.to_string_lossy().into_owned(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            WorkspaceRoot::Main => None,
            WorkspaceRoot::Directory(path) => Some(path),
        }
    }
}

impl fmt::Display for WorkspaceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for WorkspaceRoot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

pub fn is_bookkeeping_table(name: &str) -> bool {
    BOOKKEEPING_TABLES.contains(&name) || name.starts_with("sqlite_")
}
