//! Elevation lookups for the walking leg.
//!
//! Raster sampling is outside this workspace; callers plug in whatever they
//! have through [`ElevationSource`].  Three sources ship here:
//!
//! | Source                | Behaviour                                          |
//! |-----------------------|----------------------------------------------------|
//! | [`FlatTerrain`]       | `0.0` everywhere                                   |
//! | any `Fn(Coord) -> Option<f64>` | the closure                               |
//! | [`SampledElevation`]  | nearest sample from a point table, within a radius |

use std::io::Read;
use std::path::Path;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Deserialize;

use acc_core::{Coord, Crs};
use acc_network::NetworkError;

use crate::{PipelineError, PipelineResult};

pub trait ElevationSource {
    /// Elevation in metres at `pos`, or `None` when unknown.
    fn elevation_at(&self, pos: Coord) -> Option<f64>;
}

/// Every point at elevation zero: walking legs become pure Tobler flat-ground
/// times.
#[derive(Copy, Clone, Debug, Default)]
pub struct FlatTerrain;

impl ElevationSource for FlatTerrain {
    fn elevation_at(&self, _pos: Coord) -> Option<f64> {
        Some(0.0)
    }
}

impl<F> ElevationSource for F
where
    F: Fn(Coord) -> Option<f64>,
{
    fn elevation_at(&self, pos: Coord) -> Option<f64> {
        self(pos)
    }
}

// ── SampledElevation ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct Sample {
    point:     [f64; 3],
    coord:     Coord,
    elevation: f64,
}

impl RTreeObject for Sample {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for Sample {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Nearest-sample lookup over scattered `(x, y, elevation)` points.
///
/// A query farther than `max_distance_m` from every sample is unknown.
pub struct SampledElevation {
    crs:            Crs,
    max_distance_m: f64,
    tree:           RTree<Sample>,
}

impl SampledElevation {
    /// Index `samples`.  Non-finite elevations and invalid coordinates are
    /// skipped.
    pub fn new(crs: Crs, max_distance_m: f64, samples: impl IntoIterator<Item = (Coord, f64)>) -> Self {
        let entries: Vec<Sample> = samples
            .into_iter()
            .filter(|(c, z)| z.is_finite() && crs.validate(*c).is_ok())
            .map(|(c, elevation)| Sample { point: crs.embed(c), coord: c, elevation })
            .collect();
        Self { crs, max_distance_m, tree: RTree::bulk_load(entries) }
    }

    /// Load a CSV with columns `x,y,elevation`.
    pub fn load_csv(path: &Path, crs: Crs, max_distance_m: f64) -> PipelineResult<Self> {
        let file = std::fs::File::open(path).map_err(NetworkError::Io)?;
        Self::load_reader(file, crs, max_distance_m)
    }

    /// Like [`load_csv`](Self::load_csv) but accepts any `Read` source.
    pub fn load_reader<R: Read>(reader: R, crs: Crs, max_distance_m: f64) -> PipelineResult<Self> {
        #[derive(Deserialize)]
        struct Row {
            x: f64,
            y: f64,
            elevation: f64,
        }

        if !(max_distance_m.is_finite() && max_distance_m > 0.0) {
            return Err(PipelineError::Config(format!(
                "elevation max_distance_m must be finite and positive, got {max_distance_m}"
            )));
        }

        let mut rows = Vec::new();
        for result in csv::Reader::from_reader(reader).deserialize::<Row>() {
            let r = result.map_err(NetworkError::Csv)?;
            rows.push((Coord::new(r.x, r.y), r.elevation));
        }
        let source = Self::new(crs, max_distance_m, rows);
        log::info!("indexed {} elevation samples", source.len());
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl ElevationSource for SampledElevation {
    fn elevation_at(&self, pos: Coord) -> Option<f64> {
        if self.crs.validate(pos).is_err() {
            return None;
        }
        let target = self.crs.embed(pos);
        let (sample, d2) = self.tree.nearest_neighbor_iter_with_distance_2(&target).next()?;
        // Chord length never exceeds arc length.
        if d2.sqrt() > self.max_distance_m {
            return None;
        }
        if self.crs.distance_m(pos, sample.coord) > self.max_distance_m {
            return None;
        }
        Some(sample.elevation)
    }
}
