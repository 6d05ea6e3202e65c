// SPDX-License-Identifier: Apache-2.0

//! Notification sink
//!
//! Every public operation ends with exactly one terminal [`Notification`].
//! Hosts plug in a [`Notifier`]: [`TracingNotifier`] only logs, while
//! [`ChannelNotifier`] forwards to a receiver (a UI bridge, or a test).

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    OpenWorkspace,
    ImportDatabase,
    UploadDataFile,
    IngestDataframe,
    CreateDatabase,
    RemoveDatabase,
    SetCurrentDatabase,
    Query,
    BrowseTable,
    UpdateCell,
    Export,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::OpenWorkspace => "open_workspace",
            Operation::ImportDatabase => "import_database",
            Operation::UploadDataFile => "upload_data_file",
            Operation::IngestDataframe => "ingest_dataframe",
            Operation::CreateDatabase => "create_database",
            Operation::RemoveDatabase => "remove_database",
            Operation::SetCurrentDatabase => "set_current_database",
            Operation::Query => "query",
            Operation::BrowseTable => "browse_table",
            Operation::UpdateCell => "update_cell",
            Operation::Export => "export",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub operation: Operation,
    pub outcome: Outcome,
    pub message: String,
}

impl Notification {
    pub fn success(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            outcome: Outcome::Success,
            message: message.into(),
        }
    }

    pub fn failure(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            outcome: Outcome::Failure,
            message: message.into(),
        }
    }

    /// Event name in `<operation>:<success|fail>` form.
    pub fn event_name(&self) -> String {
        let suffix = match self.outcome {
            Outcome::Success => "success",
            Outcome::Failure => "fail",
        };
        format!("{}:{}", self.operation.as_str(), suffix)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.outcome {
            Outcome::Success => tracing::info!(
                event = %notification.event_name(),
                id = %notification.id,
                "{}",
                notification.message
            ),
            Outcome::Failure => tracing::error!(
                event = %notification.event_name(),
                id = %notification.id,
                "{}",
                notification.message
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_pair_operation_and_outcome() {
        let ok = Notification::success(Operation::CreateDatabase, "created orders");
        let failed = Notification::failure(Operation::Export, "disk full");
        assert_eq!(ok.event_name(), "create_database:success");
        assert_eq!(failed.event_name(), "export:fail");
        assert_ne!(ok.id, failed.id);
    }

    #[test]
    fn channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notification::success(Operation::Query, "a"));
        notifier.notify(Notification::failure(Operation::Query, "b"));

        assert_eq!(rx.try_recv().unwrap().message, "a");
        assert_eq!(rx.try_recv().unwrap().outcome, Outcome::Failure);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(Notification::success(Operation::Query, "ignored"));
    }
}
