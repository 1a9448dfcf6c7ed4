//! Matrix-subsystem error type.

use thiserror::Error;

use acc_core::{CostUnit, NodeId};

/// Errors produced by `acc-matrix`.
///
/// Unreachable pairs are not errors; they are stored as the fail value.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("{role} node {node} is not in the network")]
    NodeNotInGraph { node: NodeId, role: &'static str },

    #[error("cost {cost} from {origin} to {destination} is not below the fail value {fail}")]
    CostReachesFail { origin: NodeId, destination: NodeId, cost: f64, fail: f64 },

    #[error("destination {0} is not a column of the matrix")]
    UnknownDestination(NodeId),

    #[error("origin {0} appears twice")]
    DuplicateOrigin(NodeId),

    #[error("rank must be at least 1, got {0}")]
    InvalidRank(usize),

    #[error("matrix is in {found}, expected {expected}")]
    UnitMismatch { expected: CostUnit, found: CostUnit },

    #[error("row for {origin} has {found} cells, expected {expected}")]
    RowLength { origin: NodeId, found: usize, expected: usize },

    #[error("destinations must be strictly ascending, found {after} after {before}")]
    DestinationOrder { before: NodeId, after: NodeId },

    #[error("{cells} cells cannot fill a {origins}x{destinations} matrix")]
    Shape { cells: usize, origins: usize, destinations: usize },
}

pub type MatrixResult<T> = Result<T, MatrixError>;
