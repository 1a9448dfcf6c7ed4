//! `acc-output`: result files for accessibility runs.
//!
//! Two kinds of output live here:
//!
//! - the **OD matrix CSV** ([`odcsv`]), written row by row as the cost engine
//!   streams and read back to resume an interrupted run;
//! - the **accessibility table** and **regional summary**, written through
//!   one of three [`AccessWriter`] backends:
//!
//! | Feature   | Backend | Files created                                        |
//! |-----------|---------|------------------------------------------------------|
//! | *(none)*  | CSV     | `accessibility.csv`, `regional_summary.csv`          |
//! | `sqlite`  | SQLite  | `accessibility.db`                                   |
//! | `parquet` | Parquet | `accessibility.parquet`, `regional_summary.parquet`  |
//!
//! Missing values (origins that failed to snap) are written as an empty
//! CSV field, SQL `NULL`, or a Parquet null; never as the fail value.

pub mod csv;
pub mod error;
pub mod odcsv;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "parquet")]
pub mod parquet;

#[cfg(test)]
mod tests;

pub use crate::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use odcsv::{fingerprint_path, read_od_csv, OdCsvContents, OdCsvWriter, ROW_KEY};
pub use row::{AccessRow, AccessSchema, SummaryRow};
pub use writer::AccessWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;

#[cfg(feature = "parquet")]
pub use parquet::ParquetWriter;
