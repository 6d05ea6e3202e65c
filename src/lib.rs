// SPDX-License-Identifier: Apache-2.0

// litefed - federated workspace over many SQLite files
// Core library

pub mod catalog;
pub mod commands;
pub mod config;
pub mod engine;
pub mod export;
pub mod gatekeeper;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod observability;
pub mod session;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use litefed_core::{Dataframe, Record, Value, WorkspaceError, WorkspaceResult};

use config::AppConfig;
use notify::{Notifier, TracingNotifier};
use session::WorkspaceSession;

pub type SharedState = Arc<Mutex<AppState>>;

pub struct AppState {
    pub session: WorkspaceSession,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn new(config: AppConfig, notifier: Arc<dyn Notifier>) -> WorkspaceResult<Self> {
        let session = WorkspaceSession::open(config).await?;
        Ok(Self { session, notifier })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }
}

/// Installs logging and opens the session on the primary database.
pub async fn init(config: AppConfig) -> WorkspaceResult<SharedState> {
    observability::init_tracing(&config);
    let state = AppState::new(config, Arc::new(TracingNotifier)).await?;
    Ok(state.shared())
}
