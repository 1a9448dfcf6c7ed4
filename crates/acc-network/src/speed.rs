//! Road classification → driving speed.
//!
//! Travel time is derived once, at network build time:
//!
//! ```text
//! time_s = length_m / (speed_kmh / 3.6)
//! ```
//!
//! Source data often stores several classifications in one field when road
//! segments were merged (`"['residential', 'tertiary']"`, `"residential;tertiary"`,
//! `"residential|tertiary"`).  Such values collapse to the first listed class.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use acc_core::AccError;

use crate::{NetworkError, NetworkResult};

/// Classification → km/h, with an optional fallback speed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpeedTableSpec", into = "SpeedTableSpec")]
pub struct SpeedTable {
    speeds:      BTreeMap<String, f64>,
    default_kmh: Option<f64>,
}

/// Unvalidated serde shape of a [`SpeedTable`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedTableSpec {
    pub speeds:      BTreeMap<String, f64>,
    pub default_kmh: Option<f64>,
}

impl SpeedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Urban driving speeds used by the historical accessibility runs.
    /// No default: unlisted classes fail the build.
    pub fn osm_default() -> Self {
        const URBAN_KMH: &[(&str, f64)] = &[
            ("residential",    20.0),
            ("primary",        40.0),
            ("primary_link",   35.0),
            ("motorway",       45.0),
            ("motorway_link",  40.0),
            ("trunk",          40.0),
            ("trunk_link",     35.0),
            ("secondary",      30.0),
            ("secondary_link", 25.0),
            ("tertiary",       30.0),
            ("tertiary_link",  25.0),
            ("unclassified",   20.0),
            ("road",           20.0),
            ("crossing",       20.0),
            ("living_street",  20.0),
        ];
        Self {
            speeds: URBAN_KMH.iter().map(|&(c, v)| (c.to_owned(), v)).collect(),
            default_kmh: None,
        }
    }

    /// Set the speed for `classification`.
    pub fn insert(&mut self, classification: &str, kmh: f64) -> NetworkResult<()> {
        check_speed(classification, kmh)?;
        self.speeds.insert(primary_class(classification).to_owned(), kmh);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_speed(mut self, classification: &str, kmh: f64) -> NetworkResult<Self> {
        self.insert(classification, kmh)?;
        Ok(self)
    }

    /// Speed applied to classifications absent from the table.
    pub fn with_default(mut self, kmh: f64) -> NetworkResult<Self> {
        check_speed("<default>", kmh)?;
        self.default_kmh = Some(kmh);
        Ok(self)
    }

    pub fn default_kmh(&self) -> Option<f64> {
        self.default_kmh
    }

    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    /// Speed for a (possibly multi-valued) classification, falling back to
    /// the default.  `None` only when the class is unknown and no default is
    /// set.
    pub fn speed_for(&self, classification: &str) -> Option<f64> {
        self.speeds
            .get(primary_class(classification))
            .copied()
            .or(self.default_kmh)
    }

    /// Load a two-column CSV `classification,speed_kmh`.  A row whose
    /// classification is `*` sets the default speed.
    pub fn load_csv(path: &Path) -> NetworkResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::load_reader(file)
    }

    /// Like [`load_csv`](Self::load_csv) but accepts any `Read` source.
    pub fn load_reader<R: Read>(reader: R) -> NetworkResult<Self> {
        #[derive(Deserialize)]
        struct Row {
            classification: String,
            speed_kmh:      f64,
        }

        let mut table = Self::new();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for result in csv_reader.deserialize::<Row>() {
            let row = result?;
            if row.classification.trim() == "*" {
                table = table.with_default(row.speed_kmh)?;
            } else {
                table.insert(&row.classification, row.speed_kmh)?;
            }
        }
        Ok(table)
    }
}

impl TryFrom<SpeedTableSpec> for SpeedTable {
    type Error = NetworkError;
    fn try_from(spec: SpeedTableSpec) -> NetworkResult<Self> {
        let mut table = Self::new();
        for (class, kmh) in spec.speeds {
            table.insert(&class, kmh)?;
        }
        match spec.default_kmh {
            Some(kmh) => table.with_default(kmh),
            None => Ok(table),
        }
    }
}

impl From<SpeedTable> for SpeedTableSpec {
    fn from(t: SpeedTable) -> Self {
        Self { speeds: t.speeds, default_kmh: t.default_kmh }
    }
}

fn check_speed(classification: &str, kmh: f64) -> NetworkResult<()> {
    if kmh.is_finite() && kmh > 0.0 {
        Ok(())
    } else {
        Err(AccError::Config(format!(
            "speed for {classification:?} must be a finite positive km/h value, got {kmh}"
        ))
        .into())
    }
}

/// First classification of a possibly multi-valued field.
///
/// ```
/// use acc_network::speed::primary_class;
/// assert_eq!(primary_class("['residential', 'tertiary']"), "residential");
/// assert_eq!(primary_class("trunk;primary"), "trunk");
/// assert_eq!(primary_class(" secondary "), "secondary");
/// ```
pub fn primary_class(raw: &str) -> &str {
    let s = raw.trim();
    let s = match s.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').unwrap_or(inner),
        None => s,
    };
    let first = s.split([',', ';', '|']).next().unwrap_or_default();
    first.trim().trim_matches(['\'', '"']).trim()
}
