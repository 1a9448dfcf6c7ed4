//! Dense origin/destination cost matrix.
//!
//! # Layout
//!
//! Row-major `f64` cells.  Origins and destinations are both stored as
//! strictly ascending `NodeId` lists, so row and column lookup is a binary
//! search:
//!
//! ```text
//! costs[ row * destinations.len() + col ]
//! ```
//!
//! Cells hold a reached cost in [`unit`](OdMatrix::unit), or the run's fail
//! value for unreachable pairs.

use acc_core::{CostUnit, FailValue, NodeId};

use crate::{MatrixError, MatrixResult, RowSink};

// ── OdRow ─────────────────────────────────────────────────────────────────────

/// Costs from one origin to every destination column.
#[derive(Clone, Debug, PartialEq)]
pub struct OdRow {
    pub origin: NodeId,
    pub costs:  Vec<f64>,
}

// ── OdMatrix ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct OdMatrix {
    origins:      Vec<NodeId>,
    destinations: Vec<NodeId>,
    costs:        Vec<f64>,
    unit:         CostUnit,
}

impl OdMatrix {
    /// Assemble a matrix from its parts.
    ///
    /// `origins` and `destinations` must be strictly ascending and
    /// `costs.len()` must equal their product.
    pub fn new(
        origins: Vec<NodeId>,
        destinations: Vec<NodeId>,
        costs: Vec<f64>,
        unit: CostUnit,
    ) -> MatrixResult<Self> {
        if let Some(w) = origins.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MatrixError::DuplicateOrigin(w[1]));
        }
        if let Some(w) = destinations.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MatrixError::DestinationOrder { before: w[0], after: w[1] });
        }
        if costs.len() != origins.len() * destinations.len() {
            return Err(MatrixError::Shape {
                cells:        costs.len(),
                origins:      origins.len(),
                destinations: destinations.len(),
            });
        }
        Ok(Self { origins, destinations, costs, unit })
    }

    pub fn origins(&self) -> &[NodeId] {
        &self.origins
    }

    pub fn destinations(&self) -> &[NodeId] {
        &self.destinations
    }

    pub fn unit(&self) -> CostUnit {
        self.unit
    }

    pub fn n_origins(&self) -> usize {
        self.origins.len()
    }

    pub fn n_destinations(&self) -> usize {
        self.destinations.len()
    }

    /// Row by position.
    pub fn row_at(&self, i: usize) -> &[f64] {
        let w = self.destinations.len();
        &self.costs[i * w..(i + 1) * w]
    }

    /// Row of `origin`, `None` if it is not a row of this matrix.
    pub fn row(&self, origin: NodeId) -> Option<&[f64]> {
        self.origins.binary_search(&origin).ok().map(|i| self.row_at(i))
    }

    /// Cell for `(origin, destination)`.
    pub fn cell(&self, origin: NodeId, destination: NodeId) -> Option<f64> {
        let col = self.destinations.binary_search(&destination).ok()?;
        self.row(origin).map(|r| r[col])
    }

    /// `(origin, row)` pairs in ascending origin order.
    pub fn rows(&self) -> impl Iterator<Item = (NodeId, &[f64])> + '_ {
        self.origins.iter().enumerate().map(move |(i, &o)| (o, self.row_at(i)))
    }

    /// Column projection onto `subset` (deduplicated and sorted).
    ///
    /// # Errors
    ///
    /// [`MatrixError::UnknownDestination`] for a node that is not a column.
    pub fn slice(&self, subset: &[NodeId]) -> MatrixResult<OdMatrix> {
        let mut wanted = subset.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let cols: Vec<usize> = wanted
            .iter()
            .map(|&d| self.destinations.binary_search(&d).map_err(|_| MatrixError::UnknownDestination(d)))
            .collect::<MatrixResult<_>>()?;

        let mut costs = Vec::with_capacity(self.origins.len() * cols.len());
        for i in 0..self.origins.len() {
            let row = self.row_at(i);
            costs.extend(cols.iter().map(|&c| row[c]));
        }
        Ok(OdMatrix { origins: self.origins.clone(), destinations: wanted, costs, unit: self.unit })
    }

    /// Seconds → minutes.  Reached cells are divided by 60; sentinel cells
    /// keep exactly the fail value.
    ///
    /// # Errors
    ///
    /// [`MatrixError::UnitMismatch`] unless the matrix is in seconds.
    pub fn to_minutes(&self, fail: FailValue) -> MatrixResult<OdMatrix> {
        if self.unit != CostUnit::Seconds {
            return Err(MatrixError::UnitMismatch { expected: CostUnit::Seconds, found: self.unit });
        }
        let costs = self
            .costs
            .iter()
            .map(|&v| if fail.is_reached(v) { v / 60.0 } else { fail.value() })
            .collect();
        Ok(OdMatrix {
            origins: self.origins.clone(),
            destinations: self.destinations.clone(),
            costs,
            unit: CostUnit::Minutes,
        })
    }
}

// ── OdMatrixBuilder ───────────────────────────────────────────────────────────

/// Collects streamed rows into an [`OdMatrix`].
///
/// Rows may arrive in any origin order; [`finish`](Self::finish) sorts them.
pub struct OdMatrixBuilder {
    destinations: Vec<NodeId>,
    unit:         CostUnit,
    rows:         Vec<OdRow>,
}

impl OdMatrixBuilder {
    /// `destinations` must be strictly ascending; it becomes the column
    /// order of the finished matrix.
    pub fn new(destinations: Vec<NodeId>, unit: CostUnit) -> Self {
        Self { destinations, unit, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: OdRow) -> MatrixResult<()> {
        if row.costs.len() != self.destinations.len() {
            return Err(MatrixError::RowLength {
                origin: row.origin,
                found: row.costs.len(),
                expected: self.destinations.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn finish(mut self) -> MatrixResult<OdMatrix> {
        self.rows.sort_by_key(|r| r.origin);
        let origins: Vec<NodeId> = self.rows.iter().map(|r| r.origin).collect();
        let mut costs = Vec::with_capacity(origins.len() * self.destinations.len());
        for row in self.rows {
            costs.extend_from_slice(&row.costs);
        }
        OdMatrix::new(origins, self.destinations, costs, self.unit)
    }
}

impl RowSink for OdMatrixBuilder {
    type Error = MatrixError;

    fn accept(&mut self, row: OdRow) -> MatrixResult<()> {
        self.push(row)
    }
}
