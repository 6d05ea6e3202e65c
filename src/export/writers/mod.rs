// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use litefed_core::WorkspaceResult;

use crate::engine::types::{ColumnInfo, Row};
use crate::export::types::ExportTarget;

pub mod csv;
pub mod json;

/// Serializes one table into a single output stream.
///
/// Writers are synchronous because bundle entries are written straight into
/// a zip stream.
pub trait TableWriter: Send {
    fn write_header(&mut self, columns: &[ColumnInfo]) -> WorkspaceResult<()>;
    fn write_row(&mut self, columns: &[ColumnInfo], row: &Row) -> WorkspaceResult<()>;
    fn finish(&mut self) -> WorkspaceResult<()>;
    fn rows_written(&self) -> u64;
}

/// Writer for a bundle target; `None` for the merged database target.
pub fn create_writer<'a, W: Write + Send + 'a>(
    target: ExportTarget,
    out: W,
) -> Option<Box<dyn TableWriter + 'a>> {
    match target {
        ExportTarget::CsvBundle => Some(Box::new(csv::CsvTableWriter::new(out))),
        ExportTarget::JsonBundle => Some(Box::new(json::JsonTableWriter::new(out))),
        ExportTarget::MergedDatabase => None,
    }
}
