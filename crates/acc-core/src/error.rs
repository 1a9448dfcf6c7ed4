//! Workspace base error type.
//!
//! Sub-crates define their own error enums and wrap `AccError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::Coord;

/// Errors raised by `acc-core` validation.
#[derive(Debug, Error)]
pub enum AccError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid coordinate {coord}: {reason}")]
    InvalidCoordinate { coord: Coord, reason: &'static str },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `acc-core`.
pub type AccResult<T> = Result<T, AccError>;
