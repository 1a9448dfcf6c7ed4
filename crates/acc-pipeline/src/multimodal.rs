//! Walking leg and multimodal combination.
//!
//! The walk runs from an origin to the road node it snapped to.  Under the
//! time weight its cost comes from Tobler's hiking function:
//!
//! ```text
//! incline = (elevation_at_node - elevation_at_origin) / offset_m
//! speed   = max(max_speed * exp(-3.5 * |incline + 0.05|), min_speed)   km/h
//! time    = offset_m / 1000 * 3600 / speed                              s
//! ```
//!
//! Under the distance weight the walk cost is the offset itself.

use acc_core::{AccessConfig, FailValue};

/// Tobler walking-speed parameters, km/h.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WalkModel {
    pub max_speed_kmh: f64,
    pub min_speed_kmh: f64,
}

/// Walk time plus whether an elevation was missing at either end.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WalkLeg {
    pub seconds:           f64,
    pub missing_elevation: bool,
}

impl WalkModel {
    pub fn new(max_speed_kmh: f64, min_speed_kmh: f64) -> Self {
        Self { max_speed_kmh, min_speed_kmh }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.max_walk_speed, config.min_walk_speed)
    }

    /// Walking speed on a slope of `incline` (rise over run).
    pub fn speed_kmh(&self, incline: f64) -> f64 {
        let s = self.max_speed_kmh * (-3.5 * (incline + 0.05).abs()).exp();
        // NaN inclines fall through to the floor.
        if s >= self.min_speed_kmh { s } else { self.min_speed_kmh }
    }

    /// Seconds to walk `distance_m` from an origin at `origin_elev` to a node
    /// at `node_elev`.
    ///
    /// A zero distance is zero seconds.  A missing elevation at either end
    /// is walked as flat ground and flagged in the result.
    pub fn walk_time(&self, distance_m: f64, origin_elev: Option<f64>, node_elev: Option<f64>) -> WalkLeg {
        let (incline, missing_elevation) = match (origin_elev, node_elev) {
            (Some(o), Some(n)) => (if distance_m > 0.0 { (n - o) / distance_m } else { 0.0 }, false),
            _ => (0.0, true),
        };
        if distance_m <= 0.0 {
            return WalkLeg { seconds: 0.0, missing_elevation };
        }
        let speed = self.speed_kmh(incline);
        WalkLeg { seconds: distance_m / 1000.0 * 3600.0 / speed, missing_elevation }
    }
}

/// Walk plus drive.  The fail value absorbs: if either leg is the fail
/// value, so is the result.
pub fn combine(walk: f64, drive: f64, fail: FailValue) -> f64 {
    if fail.is_fail(walk) || fail.is_fail(drive) {
        return fail.value();
    }
    let total = walk + drive;
    // A sum that crosses the sentinel would read as unreachable.
    if fail.is_fail(total) { fail.value() } else { total }
}
