// SPDX-License-Identifier: Apache-2.0

//! Result shapes returned by the engine layer
//!
//! These types carry rows out of SQLite in a normalized form so the
//! gatekeeper, the export writers and host UIs all read the same thing.

use serde::Serialize;

pub use litefed_core::Value;

/// Information about a result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as reported by SQLite, empty for expressions
    pub data_type: String,
}

/// A single result row, values in column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

/// Rows produced by the read path of the gatekeeper
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    /// Primary-key columns of the source table that are present in the result
    pub key_columns: Vec<String>,
    /// Table the key columns belong to, when one could be identified
    pub source_table: Option<String>,
    /// True when cells can be edited by key
    pub editable: bool,
    pub execution_time_ms: f64,
}

/// Outcome of a gated statement
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    Rows(ResultSet),
    Affected {
        rows_affected: u64,
        execution_time_ms: f64,
    },
}

impl QueryOutcome {
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryOutcome::Rows(result) => Some(result),
            QueryOutcome::Affected { .. } => None,
        }
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            QueryOutcome::Rows(_) => None,
            QueryOutcome::Affected { rows_affected, .. } => Some(*rows_affected),
        }
    }
}

/// Column definition read from `pragma_table_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it
    pub primary_key_position: i64,
}

impl TableColumn {
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_position > 0
    }
}

impl From<&TableColumn> for ColumnInfo {
    fn from(col: &TableColumn) -> Self {
        ColumnInfo {
            name: col.name.clone(),
            data_type: col.data_type.clone(),
        }
    }
}

/// A schema visible on the session connection, from `pragma_database_list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveDatabase {
    pub name: String,
    /// Backing file; empty for in-memory and temp schemas
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors_match_variant() {
        let affected = QueryOutcome::Affected {
            rows_affected: 3,
            execution_time_ms: 0.5,
        };
        assert_eq!(affected.rows_affected(), Some(3));
        assert!(affected.rows().is_none());
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let affected = QueryOutcome::Affected {
            rows_affected: 1,
            execution_time_ms: 0.0,
        };
        let json = serde_json::to_value(&affected).unwrap();
        assert_eq!(json["kind"], "affected");
        assert_eq!(json["rows_affected"], 1);
    }
}
