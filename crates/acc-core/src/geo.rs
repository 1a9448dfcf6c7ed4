//! Coordinates, coordinate reference systems, and distance.
//!
//! Point sets and road nodes carry a plain `(x, y)` pair.  What that pair
//! *means* is decided once per run by [`Crs`]:
//!
//! | `Crs`                    | `x`        | `y`       | distance          |
//! |--------------------------|------------|-----------|-------------------|
//! | `Geographic`             | longitude° | latitude° | haversine, metres |
//! | `Projected { unit }`     | easting    | northing  | planar × unit     |
//!
//! Every distance leaving this module is in metres regardless of the input
//! unit.

use serde::{Deserialize, Serialize};

use crate::{AccError, AccResult};

/// Mean Earth radius, metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// ── Coord ─────────────────────────────────────────────────────────────────────

/// A coordinate pair in the run's [`Crs`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `true` if both components are finite numbers.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.x, self.y)
    }
}

// ── LinearUnit ────────────────────────────────────────────────────────────────

/// Linear unit of a projected coordinate system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearUnit {
    #[default]
    Metre,
    /// International foot (0.3048 m).
    Foot,
    /// US survey foot (1200/3937 m).
    UsSurveyFoot,
}

impl LinearUnit {
    /// Length of one unit in metres.
    #[inline]
    pub fn metres_per_unit(self) -> f64 {
        match self {
            LinearUnit::Metre        => 1.0,
            LinearUnit::Foot         => 0.3048,
            LinearUnit::UsSurveyFoot => 1200.0 / 3937.0,
        }
    }

    #[inline]
    pub fn to_metres(self, v: f64) -> f64 {
        v * self.metres_per_unit()
    }
}

// ── Crs ───────────────────────────────────────────────────────────────────────

/// Coordinate reference system shared by the network and every point set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Crs {
    /// WGS-84 longitude/latitude in degrees.
    #[default]
    Geographic,
    /// Planar coordinates in the given linear unit.
    Projected { unit: LinearUnit },
}

impl Crs {
    /// Projected CRS in metres.
    pub const fn projected_metres() -> Self {
        Crs::Projected { unit: LinearUnit::Metre }
    }

    /// Reject coordinates that cannot exist in this CRS.
    pub fn validate(self, c: Coord) -> AccResult<()> {
        if !c.is_finite() {
            return Err(AccError::InvalidCoordinate { coord: c, reason: "non-finite component" });
        }
        if let Crs::Geographic = self {
            if !(-180.0..=180.0).contains(&c.x) {
                return Err(AccError::InvalidCoordinate { coord: c, reason: "longitude outside [-180, 180]" });
            }
            if !(-90.0..=90.0).contains(&c.y) {
                return Err(AccError::InvalidCoordinate { coord: c, reason: "latitude outside [-90, 90]" });
            }
        }
        Ok(())
    }

    /// Distance between two coordinates in metres.
    pub fn distance_m(self, a: Coord, b: Coord) -> f64 {
        match self {
            Crs::Geographic => haversine_m(a, b),
            Crs::Projected { unit } => unit.to_metres((a.x - b.x).hypot(a.y - b.y)),
        }
    }

    /// Map a coordinate into 3-D Euclidean space such that straight-line
    /// distance in that space is monotone in [`distance_m`](Self::distance_m).
    ///
    /// Geographic coordinates land on a sphere of Earth radius (chord length
    /// grows monotonically with great-circle distance); projected ones on the
    /// `z = 0` plane, scaled to metres.  Spatial indexes use this embedding so
    /// nearest-neighbour order matches true distance order.
    pub fn embed(self, c: Coord) -> [f64; 3] {
        match self {
            Crs::Geographic => {
                let lat = c.y.to_radians();
                let lon = c.x.to_radians();
                [
                    EARTH_RADIUS_M * lat.cos() * lon.cos(),
                    EARTH_RADIUS_M * lat.cos() * lon.sin(),
                    EARTH_RADIUS_M * lat.sin(),
                ]
            }
            Crs::Projected { unit } => [unit.to_metres(c.x), unit.to_metres(c.y), 0.0],
        }
    }
}

/// Haversine great-circle distance in metres; `x` is longitude, `y` latitude.
pub fn haversine_m(a: Coord, b: Coord) -> f64 {
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();

    let h = (d_lat * 0.5).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
