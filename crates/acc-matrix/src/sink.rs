//! Streaming row consumers and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{MatrixError, OdRow};

/// Receives OD rows as the engine produces them, in origin order.
///
/// The engine stops at the first error a sink returns.
pub trait RowSink {
    type Error: From<MatrixError>;

    fn accept(&mut self, row: OdRow) -> Result<(), Self::Error>;
}

/// Shared flag checked between origin-row chunks.
///
/// Clones observe the same flag, so a handle can be given to a signal
/// handler or another thread while the run holds its own.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a streamed computation ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StreamStatus {
    Completed { rows: usize },
    /// Stopped at a chunk boundary; `rows` rows were delivered.
    Cancelled { rows: usize },
}

impl StreamStatus {
    pub fn rows(self) -> usize {
        match self {
            StreamStatus::Completed { rows } | StreamStatus::Cancelled { rows } => rows,
        }
    }
}
