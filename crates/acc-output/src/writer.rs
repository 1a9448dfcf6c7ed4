//! The `AccessWriter` trait implemented by all backend writers.

use crate::{AccessRow, OutputResult, SummaryRow};

/// Trait implemented by the CSV, SQLite, and Parquet writers.
pub trait AccessWriter {
    /// Write a batch of per-origin accessibility rows.
    fn write_rows(&mut self, rows: &[AccessRow]) -> OutputResult<()>;

    /// Write the regional summary rows.
    fn write_summaries(&mut self, rows: &[SummaryRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}

impl<W: AccessWriter + ?Sized> AccessWriter for Box<W> {
    fn write_rows(&mut self, rows: &[AccessRow]) -> OutputResult<()> {
        (**self).write_rows(rows)
    }

    fn write_summaries(&mut self, rows: &[SummaryRow]) -> OutputResult<()> {
        (**self).write_summaries(rows)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}
