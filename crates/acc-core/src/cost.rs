//! The "no path" sentinel.
//!
//! Unreachable origin/destination pairs are stored as a fixed, out-of-range
//! number rather than `NaN`, `None`, or infinity so that row minima and
//! comparisons stay well-defined and the value survives a CSV round trip
//! unchanged.  Costs are `f64` throughout: the historical sentinel
//! `999999999` is not representable in `f32`.

use serde::{Deserialize, Serialize};

use crate::{AccError, AccResult};

/// Reserved cost meaning "no path exists".
///
/// Every cell `v` with `v >= fail_value` is treated as unreachable; every
/// realizable cost must be strictly smaller.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FailValue(f64);

impl FailValue {
    /// The sentinel used by the historical workflows.
    pub const DEFAULT: FailValue = FailValue(999_999_999.0);

    /// Validate and wrap a sentinel.  Must be finite and positive.
    pub fn new(value: f64) -> AccResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(AccError::Config(format!(
                "fail_value must be a finite positive number, got {value}"
            )));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` if `v` encodes "unreachable".  `NaN` counts as unreachable.
    #[inline]
    pub fn is_fail(self, v: f64) -> bool {
        v.is_nan() || v >= self.0
    }

    /// `true` if `v` is a realizable (finite, below-sentinel) cost.
    #[inline]
    pub fn is_reached(self, v: f64) -> bool {
        v < self.0
    }

    /// `Some(v)` for reached costs, `None` for sentinel cells.
    #[inline]
    pub fn reached(self, v: f64) -> Option<f64> {
        self.is_reached(v).then_some(v)
    }

    /// Replace `None` with the sentinel.
    #[inline]
    pub fn or_fail(self, v: Option<f64>) -> f64 {
        v.unwrap_or(self.0)
    }
}

impl Default for FailValue {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for FailValue {
    type Error = AccError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FailValue> for f64 {
    fn from(v: FailValue) -> f64 {
        v.0
    }
}

impl std::fmt::Display for FailValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
