//! Nth-nearest facility extraction.
//!
//! Rank 1 is the row minimum over reached cells.  Rank k masks every cell
//! whose value equals a value already selected at a lower rank, then takes
//! the minimum of what is left.  Equal costs therefore collapse into one
//! rank:
//!
//! ```text
//! row [50, 50, 80, F]  →  1st = 50, 2nd = 80, 3rd = F
//! ```
//!
//! A row with fewer than k distinct reached values gets the fail value at
//! rank k.

use std::collections::BTreeMap;

use acc_core::{FailValue, NodeId};

use crate::{MatrixError, MatrixResult, OdMatrix};

/// Ranks `1..=n` of one row in a single pass.
///
/// Returns `n` values, ascending, padded with the fail value.
pub fn nearest_ranks<I>(row: I, n: usize, fail: FailValue) -> MatrixResult<Vec<f64>>
where
    I: IntoIterator<Item = f64>,
{
    if n == 0 {
        return Err(MatrixError::InvalidRank(n));
    }

    // Smallest distinct reached values seen so far, ascending, at most n.
    let mut best: Vec<f64> = Vec::with_capacity(n);
    for v in row {
        if !fail.is_reached(v) {
            continue;
        }
        let pos = best.partition_point(|&b| b < v);
        if best.get(pos) == Some(&v) {
            continue;
        }
        if pos < n {
            if best.len() == n {
                best.pop();
            }
            best.insert(pos, v);
        }
    }

    best.resize(n, fail.value());
    Ok(best)
}

/// Rank-`n` cost per origin of `od`.
pub fn nth_nearest(od: &OdMatrix, n: usize, fail: FailValue) -> MatrixResult<BTreeMap<NodeId, f64>> {
    od.rows()
        .map(|(origin, row)| {
            let ranks = nearest_ranks(row.iter().copied(), n, fail)?;
            Ok((origin, ranks[n - 1]))
        })
        .collect()
}
