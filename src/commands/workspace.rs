// SPDX-License-Identifier: Apache-2.0

//! Workspace and catalog commands

use std::collections::BTreeMap;
use std::path::Path;

use tracing::instrument;

use litefed_core::WorkspaceResult;

use crate::catalog::{CatalogEntry, WorkspaceRoot};
use crate::commands::finish;
use crate::engine::types::LiveDatabase;
use crate::engine::JournalMode;
use crate::notify::Operation;
use crate::session::WorkspaceSummary;
use crate::SharedState;

/// Opens `path` as the workspace root, or the application-private `main`
/// root when no path is given.
#[instrument(skip(state))]
pub async fn open_workspace(state: &SharedState, path: Option<&Path>) -> WorkspaceResult<WorkspaceSummary> {
    let mut state = state.lock().await;
    let result = match path {
        Some(path) => match WorkspaceRoot::directory(path) {
            Ok(root) => state.session.open_workspace(root).await,
            Err(e) => Err(e),
        },
        None => state.session.open_workspace(WorkspaceRoot::Main).await,
    };
    finish(state.notifier.as_ref(), Operation::OpenWorkspace, result, |summary| {
        format!(
            "Opened workspace {} ({} databases)",
            summary.root,
            summary.attached.len()
        )
    })
}

#[instrument(skip(state))]
pub async fn import_database(state: &SharedState, path: &Path) -> WorkspaceResult<CatalogEntry> {
    let mut state = state.lock().await;
    let result = state.session.import_database(path).await;
    finish(state.notifier.as_ref(), Operation::ImportDatabase, result, |entry| {
        format!("Imported {} as '{}'", entry.path.display(), entry.name)
    })
}

#[instrument(skip(state))]
pub async fn create_database(
    state: &SharedState,
    name: &str,
    journal: JournalMode,
) -> WorkspaceResult<CatalogEntry> {
    let mut state = state.lock().await;
    let result = state.session.create_database(name, journal).await;
    finish(state.notifier.as_ref(), Operation::CreateDatabase, result, |entry| {
        format!("Created database '{}'", entry.name)
    })
}

#[instrument(skip(state))]
pub async fn remove_database(state: &SharedState, name: &str) -> WorkspaceResult<()> {
    let mut state = state.lock().await;
    let result = state.session.remove_database(name).await;
    finish(state.notifier.as_ref(), Operation::RemoveDatabase, result, |_| {
        format!("Removed database '{}'", name.trim())
    })
}

#[instrument(skip(state))]
pub async fn set_current_database(state: &SharedState, name: &str) -> WorkspaceResult<()> {
    let mut state = state.lock().await;
    let result = state.session.set_current_database(name).await;
    finish(state.notifier.as_ref(), Operation::SetCurrentDatabase, result, |_| {
        format!("Current database is '{}'", name.trim())
    })
}

pub async fn get_current_database(state: &SharedState) -> WorkspaceResult<String> {
    state.lock().await.session.get_current_database().await
}

pub async fn list_tables(state: &SharedState) -> WorkspaceResult<BTreeMap<String, Vec<String>>> {
    state.lock().await.session.list_tables().await
}

pub async fn live_databases(state: &SharedState) -> WorkspaceResult<Vec<LiveDatabase>> {
    state.lock().await.session.live_databases().await
}
