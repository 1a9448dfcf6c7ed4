//! Edge weight attribute and cost units.

use serde::{Deserialize, Serialize};

/// Which edge attribute shortest-path searches minimise.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightAttribute {
    /// Edge length in metres.
    Distance,
    /// Derived travel time in seconds (`length / speed(classification)`).
    #[default]
    Time,
}

impl WeightAttribute {
    /// Unit of the raw costs produced when searching on this attribute.
    #[inline]
    pub fn native_unit(self) -> CostUnit {
        match self {
            WeightAttribute::Distance => CostUnit::Metres,
            WeightAttribute::Time     => CostUnit::Seconds,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeightAttribute::Distance => "distance",
            WeightAttribute::Time     => "time",
        }
    }
}

impl std::fmt::Display for WeightAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit carried by a cost value or a whole OD matrix.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostUnit {
    Metres,
    Seconds,
    Minutes,
}

impl CostUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            CostUnit::Metres  => "metres",
            CostUnit::Seconds => "seconds",
            CostUnit::Minutes => "minutes",
        }
    }
}

impl std::fmt::Display for CostUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
