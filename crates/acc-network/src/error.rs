//! Network-subsystem error type.

use thiserror::Error;

use acc_core::AccError;

/// Errors produced by `acc-network`.
///
/// Every variant here is fatal for the run.  Per-point snapping problems are
/// reported as [`SnapFailure`](crate::SnapFailure) values instead.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Structural problem in the node/edge input: dangling node reference,
    /// bad edge length, duplicate node id.
    #[error("graph integrity: {0}")]
    GraphIntegrity(String),

    #[error(
        "segment {segment} ({from} -> {to}): classification {classification:?} has no speed \
         and the speed table carries no default"
    )]
    UnknownClassification {
        classification: String,
        segment: usize,
        from: i64,
        to: i64,
    },

    #[error("duplicate point id {id:?} in point set {set:?}")]
    DuplicatePoint { set: String, id: String },

    #[error("missing column {column:?} in {table}")]
    MissingColumn { table: String, column: String },

    #[error("{table} line {line}: {message}")]
    Row { table: String, line: u64, message: String },

    #[error(transparent)]
    Core(#[from] AccError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
