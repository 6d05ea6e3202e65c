// SPDX-License-Identifier: Apache-2.0

//! Data loading commands

use std::path::Path;

use tracing::instrument;

use litefed_core::{Dataframe, WorkspaceResult};

use crate::commands::finish;
use crate::ingest::IngestOptions;
use crate::notify::Operation;
use crate::session::UploadSummary;
use crate::SharedState;

/// Builds a new database from a `.csv`, `.json` or `.sql` file.
#[instrument(skip(state))]
pub async fn upload_data_file(state: &SharedState, path: &Path) -> WorkspaceResult<UploadSummary> {
    let mut state = state.lock().await;
    let result = state.session.upload_data_file(path).await;
    finish(state.notifier.as_ref(), Operation::UploadDataFile, result, |summary| {
        format!(
            "Loaded {} into '{}'",
            path.display(),
            summary.database.name
        )
    })
}

/// Replaces `database.table` with the given rows.
#[instrument(skip(state, dataframe), fields(rows = dataframe.len()))]
pub async fn ingest_dataframe(
    state: &SharedState,
    database: &str,
    table: &str,
    dataframe: &Dataframe,
    options: IngestOptions,
) -> WorkspaceResult<u64> {
    let mut state = state.lock().await;
    let result = state
        .session
        .ingest_dataframe(database, table, dataframe, options)
        .await;
    finish(state.notifier.as_ref(), Operation::IngestDataframe, result, |rows| {
        format!("Wrote {} rows to {}.{}", rows, database, table)
    })
}
