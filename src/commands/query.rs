// SPDX-License-Identifier: Apache-2.0

//! Query, browse and cell-edit commands

use tracing::instrument;

use litefed_core::WorkspaceResult;

use crate::commands::finish;
use crate::engine::types::QueryOutcome;
use crate::gatekeeper::CellUpdate;
use crate::notify::Operation;
use crate::SharedState;

fn describe(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows(result) => format!(
            "{} rows in {:.2} ms",
            result.rows.len(),
            result.execution_time_ms
        ),
        QueryOutcome::Affected {
            rows_affected,
            execution_time_ms,
        } => format!("{} rows affected in {:.2} ms", rows_affected, execution_time_ms),
    }
}

#[instrument(skip(state, sql), fields(len = sql.len()))]
pub async fn run_query(state: &SharedState, sql: &str, editable: bool) -> WorkspaceResult<QueryOutcome> {
    let mut state = state.lock().await;
    let result = state.session.run_query(sql, editable).await;
    finish(state.notifier.as_ref(), Operation::Query, result, describe)
}

#[instrument(skip(state))]
pub async fn browse_table(state: &SharedState, table: &str) -> WorkspaceResult<QueryOutcome> {
    let mut state = state.lock().await;
    let result = state.session.browse_table(table).await;
    finish(state.notifier.as_ref(), Operation::BrowseTable, result, describe)
}

#[instrument(skip(state, request), fields(table = %request.table, column = %request.column))]
pub async fn update_cell(state: &SharedState, request: &CellUpdate) -> WorkspaceResult<u64> {
    let mut state = state.lock().await;
    let result = state.session.update_cell(request).await;
    finish(state.notifier.as_ref(), Operation::UpdateCell, result, |rows| {
        format!("Updated {} row(s)", rows)
    })
}
