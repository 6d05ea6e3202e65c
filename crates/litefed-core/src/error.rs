// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for litefed
//!
//! Every core operation reports failures through [`WorkspaceError`]. SQLite,
//! filesystem, CSV, JSON and archive errors are mapped into it at the call
//! site so callers see one taxonomy regardless of where a failure started.

use serde::Serialize;
use thiserror::Error;

use crate::sensitive::Sensitive;

/// Unified error type for catalog, ingestion, query and export operations
#[derive(Debug, Error, Serialize)]
pub enum WorkspaceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("Resource exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("Forbidden statement: {message}")]
    ForbiddenStatement { message: String },

    /// The SQL engine rejected a statement. The statement text is kept for
    /// diagnostics but never rendered by `Display`.
    #[error("Engine error: {message}")]
    Engine {
        message: String,
        statement: Option<Sensitive<String>>,
    },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    #[error("No schema could be inferred: {message}")]
    NoSchema { message: String },

    #[error("Row {row} is missing column '{column}'")]
    MissingColumn { column: String, row: usize },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl WorkspaceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation { message: msg.into() }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted { message: msg.into() }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::ForbiddenStatement { message: msg.into() }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
            statement: None,
        }
    }

    pub fn engine_with_statement(msg: impl Into<String>, statement: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
            statement: Some(Sensitive::new(statement.into())),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound { message: msg.into() }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput { message: msg.into() }
    }

    pub fn no_schema(msg: impl Into<String>) -> Self {
        Self::NoSchema { message: msg.into() }
    }

    pub fn missing_column(column: impl Into<String>, row: usize) -> Self {
        Self::MissingColumn {
            column: column.into(),
            row,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io { message: msg.into() }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization { message: msg.into() }
    }

    /// Statement text attached to an engine error, for trusted diagnostics only.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Engine {
                statement: Some(statement),
                ..
            } => Some(statement.expose().as_str()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WorkspaceError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for WorkspaceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Result type alias for workspace operations
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display_hides_statement() {
        let err = WorkspaceError::engine_with_statement(
            "no such table: secrets",
            "SELECT password FROM secrets",
        );
        let shown = err.to_string();
        assert_eq!(shown, "Engine error: no such table: secrets");
        assert!(!format!("{:?}", err).contains("password"));
        assert_eq!(err.statement(), Some("SELECT password FROM secrets"));
    }

    #[test]
    fn engine_error_serializes_redacted() {
        let err = WorkspaceError::engine_with_statement("boom", "DROP TABLE t");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"***\""));
        assert!(!json.contains("DROP TABLE"));
    }

    #[test]
    fn missing_column_message_names_row() {
        let err = WorkspaceError::missing_column("score", 3);
        assert_eq!(err.to_string(), "Row 3 is missing column 'score'");
        assert!(err.statement().is_none());
    }
}
