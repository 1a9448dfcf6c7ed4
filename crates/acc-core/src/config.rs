//! Run configuration.
//!
//! Loaded from JSON by the batch driver and passed by reference to every
//! stage.  [`AccessConfig::validate`] is called once when a pipeline is built;
//! downstream code may assume the invariants it checks.

use serde::{Deserialize, Serialize};

use crate::{AccError, AccResult, CostUnit, Crs, FailValue, WeightAttribute};

/// Recognised options for one accessibility run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// Edge attribute minimised by the cost engine.
    pub weight_attribute: WeightAttribute,

    /// Sentinel stored for unreachable pairs.
    pub fail_value: FailValue,

    /// How many nearest facilities to report per category (N ≥ 1).
    pub num_nearest: usize,

    /// Paths longer than this many metres are reported as unreachable even
    /// when the graph connects them.  `None` disables the cutoff.
    pub max_search_distance: Option<f64>,

    /// Points farther than this many metres from every node fail to snap.
    /// `None` accepts any offset.
    pub max_snap_distance: Option<f64>,

    /// Lower clamp of the Tobler walking speed, km/h.
    pub min_walk_speed: f64,

    /// Flat-terrain peak of the Tobler walking speed, km/h.
    pub max_walk_speed: f64,

    /// Coordinate reference system shared by the network and point sets.
    pub crs: Crs,

    /// Report time costs in minutes instead of seconds.
    pub report_minutes: bool,

    /// Origin rows per engine chunk.  Cancellation and progress reporting
    /// happen at chunk boundaries.
    pub chunk_rows: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            weight_attribute:    WeightAttribute::Time,
            fail_value:          FailValue::DEFAULT,
            num_nearest:         3,
            max_search_distance: None,
            max_snap_distance:   None,
            min_walk_speed:      0.1,
            max_walk_speed:      6.0,
            crs:                 Crs::Geographic,
            report_minutes:      false,
            chunk_rows:          1024,
        }
    }
}

impl AccessConfig {
    /// Check every cross-field invariant.
    pub fn validate(&self) -> AccResult<()> {
        if self.num_nearest == 0 {
            return Err(AccError::Config("num_nearest must be at least 1".into()));
        }
        if self.chunk_rows == 0 {
            return Err(AccError::Config("chunk_rows must be at least 1".into()));
        }
        check_positive_opt("max_search_distance", self.max_search_distance)?;
        check_positive_opt("max_snap_distance", self.max_snap_distance)?;
        if !(self.min_walk_speed.is_finite() && self.min_walk_speed > 0.0) {
            return Err(AccError::Config(format!(
                "min_walk_speed must be a finite positive km/h value, got {}",
                self.min_walk_speed
            )));
        }
        if !(self.max_walk_speed.is_finite() && self.max_walk_speed >= self.min_walk_speed) {
            return Err(AccError::Config(format!(
                "max_walk_speed ({}) must be finite and not below min_walk_speed ({})",
                self.max_walk_speed, self.min_walk_speed
            )));
        }
        if self.report_minutes && self.weight_attribute != WeightAttribute::Time {
            return Err(AccError::Config(
                "report_minutes requires weight_attribute = \"time\"".into(),
            ));
        }
        Ok(())
    }

    /// Unit of every cost written to the accessibility table.
    pub fn output_unit(&self) -> CostUnit {
        if self.report_minutes {
            CostUnit::Minutes
        } else {
            self.weight_attribute.native_unit()
        }
    }
}

fn check_positive_opt(name: &str, v: Option<f64>) -> AccResult<()> {
    match v {
        Some(d) if !(d.is_finite() && d > 0.0) => Err(AccError::Config(format!(
            "{name} must be a finite positive number of metres, got {d}"
        ))),
        _ => Ok(()),
    }
}
