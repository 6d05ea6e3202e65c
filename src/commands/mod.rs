// SPDX-License-Identifier: Apache-2.0

//! Command layer
//!
//! One async entry point per public operation. Each locks the shared state,
//! runs the session operation and emits exactly one terminal notification.

pub mod export;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod workspace;

use litefed_core::WorkspaceResult;

use crate::notify::{Notification, Notifier, Operation};

/// Emits the terminal notification for `result` and passes it through.
pub(crate) fn finish<T>(
    notifier: &dyn Notifier,
    operation: Operation,
    result: WorkspaceResult<T>,
    describe: impl FnOnce(&T) -> String,
) -> WorkspaceResult<T> {
    match &result {
        Ok(value) => notifier.notify(Notification::success(operation, describe(value))),
        Err(e) => notifier.notify(Notification::failure(operation, e.to_string())),
    }
    result
}
