// SPDX-License-Identifier: Apache-2.0

//! Export command

use std::path::Path;

use tracing::instrument;

use litefed_core::WorkspaceResult;

use crate::commands::finish;
use crate::export::{ExportSummary, ExportTarget};
use crate::notify::Operation;
use crate::SharedState;

#[instrument(skip(state))]
pub async fn export_all(
    state: &SharedState,
    target: ExportTarget,
    destination: &Path,
) -> WorkspaceResult<ExportSummary> {
    let mut state = state.lock().await;
    let result = state.session.export(target, destination).await;
    finish(state.notifier.as_ref(), Operation::Export, result, |summary| {
        format!(
            "Exported {} tables ({} rows) to {}",
            summary.tables.len(),
            summary.total_rows(),
            summary.destination.display()
        )
    })
}
