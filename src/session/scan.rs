// SPDX-License-Identifier: Apache-2.0

//! Recursive discovery of database files under a workspace root.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use litefed_core::ident::is_database_file;

/// Canonical paths of `.db`/`.sqlite` files below `root`, in a stable order.
/// Unreadable entries are logged and skipped.
pub fn discover_database_files(root: &Path, exclude: &[PathBuf]) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_database_file(entry.path()) {
            continue;
        }
        let path = match entry.path().canonicalize() {
            Ok(path) => path,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping database file");
                continue;
            }
        };
        if exclude.contains(&path) {
            continue;
        }
        debug!(path = %path.display(), "Discovered database file");
        found.push(path);
    }
    found
}
