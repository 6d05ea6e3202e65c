// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use litefed_core::{Value, WorkspaceError, WorkspaceResult};

use crate::engine::types::{ColumnInfo, Row};
use crate::export::writers::TableWriter;

/// Streams a table as one JSON array of row objects.
pub struct JsonTableWriter<W: Write> {
    out: W,
    started: bool,
    rows_written: u64,
}

impl<W: Write> JsonTableWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            started: false,
            rows_written: 0,
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> WorkspaceResult<()> {
        self.out
            .write_all(bytes)
            .map_err(|e| WorkspaceError::io(format!("JSON write failed: {}", e)))
    }

    fn ensure_started(&mut self) -> WorkspaceResult<()> {
        if !self.started {
            self.write_bytes(b"[")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> TableWriter for JsonTableWriter<W> {
    fn write_header(&mut self, _columns: &[ColumnInfo]) -> WorkspaceResult<()> {
        self.ensure_started()
    }

    fn write_row(&mut self, columns: &[ColumnInfo], row: &Row) -> WorkspaceResult<()> {
        self.ensure_started()?;

        let mut obj = serde_json::Map::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            let value = row.get(idx).unwrap_or(&Value::Null);
            obj.insert(col.name.clone(), value.to_json());
        }
        let serialized = serde_json::to_string(&serde_json::Value::Object(obj))?;

        if self.rows_written > 0 {
            self.write_bytes(b",\n")?;
        } else {
            self.write_bytes(b"\n")?;
        }
        self.write_bytes(serialized.as_bytes())?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> WorkspaceResult<()> {
        self.ensure_started()?;
        if self.rows_written > 0 {
            self.write_bytes(b"\n")?;
        }
        self.write_bytes(b"]\n")?;
        self.out
            .flush()
            .map_err(|e| WorkspaceError::io(format!("JSON flush failed: {}", e)))
    }

    fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
