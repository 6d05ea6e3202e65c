// SPDX-License-Identifier: Apache-2.0

// Engine Module
// SQLite access shared by the catalog, ingestion, gatekeeper and export layers

pub mod sqlite;
pub mod types;

pub use sqlite::JournalMode;
pub use types::*;
