//! Fluent builder for constructing a [`Pipeline`].

use std::path::PathBuf;

use rustc_hash::FxHashSet;

use acc_core::AccessConfig;
use acc_network::{PointSet, RoadNetwork};

use crate::elevation::{ElevationSource, FlatTerrain};
use crate::pipeline::{Pipeline, PipelineContext};
use crate::{Category, PipelineError, PipelineResult, RegionSpec};

/// Fluent builder for [`Pipeline`].
///
/// # Required inputs
///
/// - [`RoadNetwork`] in the same CRS as `config.crs`
/// - [`AccessConfig`]
/// - the origin [`PointSet`]
/// - at least one [`Category`] via [`.category(c)`](Self::category)
///
/// # Optional inputs
///
/// | Method                | Default                                   |
/// |-----------------------|-------------------------------------------|
/// | `.elevation(src)`     | [`FlatTerrain`]                           |
/// | `.straight_line(b)`   | `false`: no `{prefix}-straight` columns   |
/// | `.regions(spec)`      | no regional summary                       |
/// | `.checkpoint(path)`   | no OD CSV, no resume                      |
/// | `.retain_matrix(b)`   | `false`: rows are summarised and dropped  |
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PipelineBuilder::new(network, config, origins)
///     .category(Category::new("hospital", hospitals))
///     .category(Category::new("school", schools))
///     .checkpoint("out/od.csv".into())
///     .build()?;
/// let report = pipeline.run(&mut LogObserver::new(), &CancelToken::new())?;
/// ```
pub struct PipelineBuilder {
    network:       RoadNetwork,
    config:        AccessConfig,
    origins:       PointSet,
    categories:    Vec<Category>,
    elevation:     Box<dyn ElevationSource>,
    straight_line: bool,
    regions:       Option<RegionSpec>,
    checkpoint:    Option<PathBuf>,
    retain_matrix: bool,
}

impl PipelineBuilder {
    pub fn new(network: RoadNetwork, config: AccessConfig, origins: PointSet) -> Self {
        Self {
            network,
            config,
            origins,
            categories:    Vec::new(),
            elevation:     Box::new(FlatTerrain),
            straight_line: false,
            regions:       None,
            checkpoint:    None,
            retain_matrix: false,
        }
    }

    /// Add a facility category.  Column order follows call order.
    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    /// Elevation lookup for the walking leg.
    pub fn elevation(mut self, source: impl ElevationSource + 'static) -> Self {
        self.elevation = Box::new(source);
        self
    }

    /// Also report straight-line distance to the nearest facility.
    pub fn straight_line(mut self, enabled: bool) -> Self {
        self.straight_line = enabled;
        self
    }

    pub fn regions(mut self, spec: RegionSpec) -> Self {
        self.regions = Some(spec);
        self
    }

    /// Append every computed OD row to `path`; resume from it if present.
    ///
    /// The run fingerprint is written beside it; a checkpoint written under
    /// different settings or a different network is refused on resume.
    pub fn checkpoint(mut self, path: PathBuf) -> Self {
        self.checkpoint = Some(path);
        self
    }

    /// Keep the full OD matrix in the report.
    pub fn retain_matrix(mut self, enabled: bool) -> Self {
        self.retain_matrix = enabled;
        self
    }

    /// Validate inputs and return a ready-to-run [`Pipeline`].
    pub fn build(self) -> PipelineResult<Pipeline> {
        self.config.validate()?;

        if self.network.crs != self.config.crs {
            return Err(PipelineError::Config(format!(
                "network CRS {:?} differs from configured CRS {:?}",
                self.network.crs, self.config.crs
            )));
        }
        if self.categories.is_empty() {
            return Err(PipelineError::Config("at least one facility category is required".into()));
        }

        let mut names = FxHashSet::default();
        let mut prefixes = FxHashSet::default();
        for c in &self.categories {
            if c.name.trim().is_empty() || c.prefix.trim().is_empty() {
                return Err(PipelineError::Config("category names and prefixes must be non-empty".into()));
            }
            if !names.insert(c.name.as_str()) {
                return Err(PipelineError::Config(format!("duplicate category name {:?}", c.name)));
            }
            if !prefixes.insert(c.prefix.as_str()) {
                return Err(PipelineError::Config(format!("duplicate column prefix {:?}", c.prefix)));
            }
        }

        if let Some(spec) = &self.regions {
            let attrs = self.origins.attr_names();
            let missing = std::iter::once(&spec.attribute)
                .chain(spec.weight.as_ref())
                .find(|a| !attrs.contains(*a));
            if let Some(a) = missing {
                return Err(PipelineError::Config(format!(
                    "origin set {:?} has no attribute {a:?} for regional summaries",
                    self.origins.name()
                )));
            }
        }

        Ok(Pipeline {
            ctx: PipelineContext {
                network:    self.network,
                config:     self.config,
                origins:    self.origins,
                categories: self.categories,
            },
            elevation:     self.elevation,
            straight_line: self.straight_line,
            regions:       self.regions,
            checkpoint:    self.checkpoint,
            retain_matrix: self.retain_matrix,
        })
    }
}
