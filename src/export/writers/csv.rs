// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use litefed_core::{Value, WorkspaceError, WorkspaceResult};

use crate::engine::types::{ColumnInfo, Row};
use crate::export::writers::TableWriter;

pub struct CsvTableWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
    rows_written: u64,
}

impl<W: Write> CsvTableWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(false).from_writer(out),
            header_written: false,
            rows_written: 0,
        }
    }

    fn csv_error(err: csv::Error) -> WorkspaceError {
        WorkspaceError::serialization(format!("CSV write failed: {}", err))
    }
}

impl<W: Write + Send> TableWriter for CsvTableWriter<W> {
    fn write_header(&mut self, columns: &[ColumnInfo]) -> WorkspaceResult<()> {
        if self.header_written || columns.is_empty() {
            return Ok(());
        }
        self.writer
            .write_record(columns.iter().map(|col| col.name.as_str()))
            .map_err(Self::csv_error)?;
        self.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, columns: &[ColumnInfo], row: &Row) -> WorkspaceResult<()> {
        if columns.is_empty() {
            return Ok(());
        }
        let fields = (0..columns.len()).map(|idx| {
            row.get(idx)
                .unwrap_or(&Value::Null)
                .to_display_string()
        });
        self.writer.write_record(fields).map_err(Self::csv_error)?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> WorkspaceResult<()> {
        self.writer
            .flush()
            .map_err(|e| WorkspaceError::io(format!("CSV flush failed: {}", e)))
    }

    fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
