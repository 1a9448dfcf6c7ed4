//! JSON run file: where the inputs live and how the run is configured.
//!
//! Relative paths are resolved against the run file's directory.
//!
//! ```json
//! {
//!   "config":     { "crs": { "kind": "projected", "unit": "metre" }, "num_nearest": 2 },
//!   "network":    { "nodes": "data/nodes.csv", "edges": "data/edges.csv" },
//!   "origins":    { "path": "data/villages.csv" },
//!   "categories": [ { "name": "hospital", "path": "data/hospitals.csv" } ],
//!   "regions":    { "attribute": "region", "weight": "population" }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use acc_core::{AccessConfig, Crs};
use acc_network::{load_network_csv, load_points_csv, NetworkColumns, PointColumns, PointSet, RoadNetwork, SpeedTable};
use acc_pipeline::{Category, RegionSpec, SampledElevation};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    #[serde(default)]
    pub config:        AccessConfig,
    pub network:       NetworkInput,
    pub origins:       PointInput,
    pub categories:    Vec<CategoryInput>,
    #[serde(default)]
    pub elevation:     Option<ElevationInput>,
    #[serde(default)]
    pub regions:       Option<RegionSpec>,
    #[serde(default)]
    pub straight_line: bool,
    #[serde(default)]
    pub checkpoint:    Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir:    PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkInput {
    pub nodes:      PathBuf,
    pub edges:      PathBuf,
    #[serde(default)]
    pub columns:    NetworkColumns,
    /// Inline speed table.  Takes precedence over `speeds_csv`.
    #[serde(default)]
    pub speeds:     Option<SpeedTable>,
    #[serde(default)]
    pub speeds_csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointInput {
    pub path:    PathBuf,
    #[serde(default)]
    pub columns: PointColumns,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    pub name:    String,
    pub path:    PathBuf,
    #[serde(default)]
    pub prefix:  Option<String>,
    #[serde(default)]
    pub columns: PointColumns,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElevationInput {
    pub path:           PathBuf,
    pub max_distance_m: f64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl RunFile {
    /// Parse `path` and resolve every relative path against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading run file {}", path.display()))?;
        let mut run: RunFile =
            serde_json::from_str(&text).with_context(|| format!("parsing run file {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut run.network.nodes);
        resolve(&mut run.network.edges);
        if let Some(p) = run.network.speeds_csv.as_mut() {
            resolve(p);
        }
        resolve(&mut run.origins.path);
        for c in &mut run.categories {
            resolve(&mut c.path);
        }
        if let Some(e) = run.elevation.as_mut() {
            resolve(&mut e.path);
        }
        if let Some(p) = run.checkpoint.as_mut() {
            resolve(p);
        }
        resolve(&mut run.output_dir);
        Ok(run)
    }

    pub fn speed_table(&self) -> Result<SpeedTable> {
        if let Some(t) = &self.network.speeds {
            return Ok(t.clone());
        }
        match &self.network.speeds_csv {
            Some(p) => SpeedTable::load_csv(p).with_context(|| format!("loading speed table {}", p.display())),
            None => Ok(SpeedTable::osm_default()),
        }
    }

    pub fn load_network(&self) -> Result<RoadNetwork> {
        let speeds = self.speed_table()?;
        let n = &self.network;
        load_network_csv(&n.nodes, &n.edges, &n.columns, &speeds, self.config.crs)
            .with_context(|| format!("loading network {} / {}", n.nodes.display(), n.edges.display()))
    }

    pub fn load_origins(&self) -> Result<PointSet> {
        load_points_csv(&self.origins.path, "origins", &self.origins.columns)
            .with_context(|| format!("loading origins {}", self.origins.path.display()))
    }

    pub fn load_categories(&self) -> Result<Vec<Category>> {
        self.categories
            .iter()
            .map(|c| {
                let points = load_points_csv(&c.path, &c.name, &c.columns)
                    .with_context(|| format!("loading category {:?} from {}", c.name, c.path.display()))?;
                let category = Category::new(c.name.clone(), points);
                Ok(match &c.prefix {
                    Some(p) => category.with_prefix(p.clone()),
                    None => category,
                })
            })
            .collect()
    }

    pub fn load_elevation(&self, crs: Crs) -> Result<Option<SampledElevation>> {
        self.elevation
            .as_ref()
            .map(|e| {
                SampledElevation::load_csv(&e.path, crs, e.max_distance_m)
                    .with_context(|| format!("loading elevation samples {}", e.path.display()))
            })
            .transpose()
    }
}
