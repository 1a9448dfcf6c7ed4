//! Snapping point sets onto road nodes.
//!
//! Every input record yields exactly one [`SnapRecord`], in input order.
//! The same algorithm runs for a handful of facilities and for a million
//! origins: an R-tree nearest-neighbour walk in the CRS embedding, which
//! orders nodes exactly as the true great-circle (or planar) distance does.
//!
//! Equidistant nodes resolve to the lowest `NodeId`.

use thiserror::Error;

use acc_core::{Coord, NodeId};

use crate::network::RoadNetwork;
use crate::points::PointSet;

/// A successful snap: the chosen node and the point→node offset in metres.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Snapped {
    pub node: NodeId,
    pub offset_m: f64,
}

/// Why a single record could not be snapped.  Never aborts the run.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum SnapFailure {
    #[error("network has no nodes")]
    EmptyNetwork,

    #[error("nearest node {nearest} is {offset_m:.1} m away, beyond the snap tolerance")]
    BeyondTolerance { nearest: NodeId, offset_m: f64 },

    #[error("invalid coordinate {coord}: {reason}")]
    InvalidCoordinate { coord: Coord, reason: &'static str },
}

pub type SnapRecord = Result<Snapped, SnapFailure>;

/// Snap a single coordinate.
///
/// `tolerance_m`, when set, is the largest accepted offset in metres.
pub fn snap_point(network: &RoadNetwork, pos: Coord, tolerance_m: Option<f64>) -> SnapRecord {
    if let Err(acc_core::AccError::InvalidCoordinate { coord, reason }) = network.crs.validate(pos) {
        return Err(SnapFailure::InvalidCoordinate { coord, reason });
    }

    let mut candidates = network.nearest_nodes(pos);
    let (mut best, best_d2) = candidates.next().ok_or(SnapFailure::EmptyNetwork)?;
    for (node, d2) in candidates {
        if d2 > best_d2 {
            break;
        }
        best = best.min(node);
    }

    let offset_m = network.offset_m(pos, best);
    match tolerance_m {
        Some(tol) if offset_m > tol => Err(SnapFailure::BeyondTolerance { nearest: best, offset_m }),
        _ => Ok(Snapped { node: best, offset_m }),
    }
}

/// Snap every record of `points`.  Output order equals input order.
pub fn snap(network: &RoadNetwork, points: &PointSet, tolerance_m: Option<f64>) -> Vec<SnapRecord> {
    #[cfg(feature = "parallel")]
    let records: Vec<SnapRecord> = {
        use rayon::prelude::*;
        points
            .coords()
            .par_iter()
            .map(|&c| snap_point(network, c, tolerance_m))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let records: Vec<SnapRecord> = points
        .coords()
        .iter()
        .map(|&c| snap_point(network, c, tolerance_m))
        .collect();

    let failed = records.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        log::warn!("{failed} of {} records in {:?} failed to snap", records.len(), points.name());
    } else {
        log::debug!("snapped {} records in {:?}", records.len(), points.name());
    }
    records
}

/// Sorted, deduplicated set of nodes that records snapped to.
pub fn distinct_nodes(records: &[SnapRecord]) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = records.iter().filter_map(|r| r.as_ref().ok().map(|s| s.node)).collect();
    nodes.sort_unstable();
    nodes.dedup();
    nodes
}
