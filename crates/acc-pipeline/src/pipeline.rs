//! One accessibility run, from snapping to regional summaries.
//!
//! # Stages
//!
//! ```text
//! ① Snap      origins and every category onto the network.
//! ② Resume    (checkpoint only) check the run fingerprint, load finished
//!             OD rows, skip their origins.
//! ③ Costs     one search per distinct origin node against the union of
//!             all category nodes; each row is reduced to nearest ranks
//!             per category and appended to the checkpoint, then dropped.
//! ④ Assemble  per origin: drive ranks, walk leg, multimodal ranks,
//!             straight-line distances, composite, class.
//! ⑤ Summaries (regions only) weighted aggregation.
//! ```
//!
//! # Column layout
//!
//! ```text
//! {c}-1st..{c}-Nth  (every category)
//! walk-leg
//! {c}-mm-1st..{c}-mm-Nth  (every category)
//! {c}-straight  (every category, when enabled)
//! composite
//! ```

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use acc_core::{AccessConfig, FailValue, NodeId, WeightAttribute};
use acc_matrix::{
    nearest_ranks, CancelToken, CostEngine, DestinationSet, MatrixResult, OdMatrixBuilder, OdRow, RowSink,
    StreamStatus,
};
use acc_network::{distinct_nodes, snap, PointSet, RoadNetwork, SnapRecord};
use acc_output::{fingerprint_path, read_od_csv, AccessSchema, OdCsvWriter};

use crate::classes::{composite, AccessClass, ClassBreaks};
use crate::elevation::ElevationSource;
use crate::multimodal::{combine, WalkModel};
use crate::observer::{PipelineObserver, Stage};
use crate::report::{AccessRecord, RunReport, RunStatus, Scores};
use crate::straight::nearest_straight_line;
use crate::summary::summarise;
use crate::{Category, PipelineError, PipelineResult, RegionSpec};

/// Inputs owned by one run.  The network is read-only for the run's
/// lifetime.
pub struct PipelineContext {
    pub network:    RoadNetwork,
    pub config:     AccessConfig,
    pub origins:    PointSet,
    pub categories: Vec<Category>,
}

/// A validated pipeline.  Build with [`PipelineBuilder`](crate::PipelineBuilder).
pub struct Pipeline {
    pub(crate) ctx:           PipelineContext,
    pub(crate) elevation:     Box<dyn ElevationSource>,
    pub(crate) straight_line: bool,
    pub(crate) regions:       Option<RegionSpec>,
    pub(crate) checkpoint:    Option<PathBuf>,
    pub(crate) retain_matrix: bool,
}

// ── Rank projection ───────────────────────────────────────────────────────────

/// Column positions of each category within the union destination set.
struct RankProjector {
    columns: Vec<Vec<usize>>,
    n:       usize,
    fail:    FailValue,
}

impl RankProjector {
    fn new(dests: &DestinationSet, category_nodes: &[Vec<NodeId>], n: usize, fail: FailValue) -> Self {
        let columns = category_nodes
            .iter()
            .map(|nodes| nodes.iter().filter_map(|node| dests.nodes().binary_search(node).ok()).collect())
            .collect();
        Self { columns, n, fail }
    }

    /// Ranks `1..=n` of every category, concatenated in category order.
    fn ranks(&self, costs: &[f64]) -> MatrixResult<Vec<f64>> {
        let mut out = Vec::with_capacity(self.columns.len() * self.n);
        for cols in &self.columns {
            out.extend(nearest_ranks(cols.iter().map(|&c| costs[c]), self.n, self.fail)?);
        }
        Ok(out)
    }
}

// ── Row sink ──────────────────────────────────────────────────────────────────

struct RunSink<'a> {
    network:     &'a RoadNetwork,
    projector:   &'a RankProjector,
    ranks:       FxHashMap<NodeId, Vec<f64>>,
    od_csv:      Option<OdCsvWriter>,
    matrix:      Option<OdMatrixBuilder>,
    flush_every: usize,
    unflushed:   usize,
}

impl RunSink<'_> {
    /// Reduce a row to ranks and keep it in the matrix if retained.
    fn record(&mut self, row: OdRow) -> PipelineResult<()> {
        let ranks = self.projector.ranks(&row.costs)?;
        self.ranks.insert(row.origin, ranks);
        if let Some(m) = &mut self.matrix {
            m.push(row)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> PipelineResult<()> {
        if let Some(w) = &mut self.od_csv {
            w.flush()?;
        }
        self.unflushed = 0;
        Ok(())
    }
}

impl RowSink for RunSink<'_> {
    type Error = PipelineError;

    fn accept(&mut self, row: OdRow) -> PipelineResult<()> {
        if let Some(w) = &mut self.od_csv {
            w.write_row(self.network.external_id(row.origin), &row.costs)?;
            self.unflushed += 1;
            if self.unflushed >= self.flush_every {
                w.flush()?;
                self.unflushed = 0;
            }
        }
        self.record(row)
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

impl Pipeline {
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Column layout of this pipeline's accessibility table.
    pub fn schema(&self) -> AccessSchema {
        let n = self.ctx.config.num_nearest;
        let cats = &self.ctx.categories;
        let mut columns: Vec<String> = cats.iter().flat_map(|c| c.drive_columns(n)).collect();
        columns.push("walk-leg".to_owned());
        columns.extend(cats.iter().flat_map(|c| c.multimodal_columns(n)));
        if self.straight_line {
            columns.extend(cats.iter().map(Category::straight_column));
        }
        columns.push("composite".to_owned());
        AccessSchema::new(columns)
    }

    /// Settings that determine every OD cell: weight attribute, fail value,
    /// search cutoff, and the network's content hash.  Recorded beside the
    /// checkpoint; resuming requires an exact match.
    pub fn run_fingerprint(&self) -> String {
        let cfg = &self.ctx.config;
        let cutoff = cfg.max_search_distance.map_or_else(|| "none".to_owned(), |d| d.to_string());
        format!(
            "weight={} fail={} max_search={cutoff} network={:016x}",
            cfg.weight_attribute.as_str(),
            cfg.fail_value.value(),
            self.ctx.network.content_hash(),
        )
    }

    /// Execute every stage.
    ///
    /// Unreachable facilities are data (the fail value), never errors.
    /// Integrity problems (checkpoint mismatch, I/O failure) abort the run;
    /// rows computed before the failure stay in the checkpoint.
    pub fn run<O: PipelineObserver>(&self, observer: &mut O, cancel: &CancelToken) -> PipelineResult<RunReport> {
        let ctx = &self.ctx;
        let cfg = &ctx.config;
        let fail = cfg.fail_value;

        // ── ① Snap ─────────────────────────────────────────────────────────
        observer.on_stage(Stage::Snap);
        let origin_snaps = snap(&ctx.network, &ctx.origins, cfg.max_snap_distance);
        let category_snaps: Vec<Vec<SnapRecord>> = ctx
            .categories
            .iter()
            .map(|c| snap(&ctx.network, &c.points, cfg.max_snap_distance))
            .collect();

        let origin_nodes = distinct_nodes(&origin_snaps);
        let category_nodes: Vec<Vec<NodeId>> = category_snaps.iter().map(|r| distinct_nodes(r)).collect();
        let dests = DestinationSet::new(&ctx.network, &category_nodes.concat())?;
        let projector = RankProjector::new(&dests, &category_nodes, cfg.num_nearest, fail);
        log::info!(
            "{} origins on {} distinct nodes; {} destination nodes across {} categories",
            ctx.origins.len(),
            origin_nodes.len(),
            dests.len(),
            ctx.categories.len(),
        );

        let mut sink = RunSink {
            network:     &ctx.network,
            projector:   &projector,
            ranks:       FxHashMap::default(),
            od_csv:      None,
            matrix:      self
                .retain_matrix
                .then(|| OdMatrixBuilder::new(dests.nodes().to_vec(), cfg.weight_attribute.native_unit())),
            flush_every: cfg.chunk_rows,
            unflushed:   0,
        };

        // ── ② Resume ───────────────────────────────────────────────────────
        let done = match &self.checkpoint {
            Some(path) => self.open_checkpoint(path, &dests, &origin_nodes, &mut sink, observer)?,
            None => FxHashSet::default(),
        };
        let rows_resumed = done.len();
        let pending: Vec<NodeId> = origin_nodes.iter().copied().filter(|n| !done.contains(n)).collect();

        // ── ③ Costs ────────────────────────────────────────────────────────
        observer.on_stage(Stage::Costs);
        let total = origin_nodes.len();
        observer.on_rows(rows_resumed, total);
        let engine = CostEngine::from_config(&ctx.network, cfg);
        let streamed = engine.stream_rows(&pending, &dests, cfg.chunk_rows, cancel, &mut sink, |rows| {
            observer.on_rows(rows_resumed + rows, total)
        });
        sink.flush()?;
        let status = streamed?;

        let facility_snap_failures: Vec<(String, usize)> = ctx
            .categories
            .iter()
            .zip(&category_snaps)
            .map(|(c, r)| (c.name.clone(), r.iter().filter(|s| s.is_err()).count()))
            .collect();

        let mut report = RunReport {
            status:                 RunStatus::Completed,
            rows_computed:          status.rows(),
            rows_resumed,
            origin_snap_failures:   origin_snaps.iter().filter(|s| s.is_err()).count(),
            facility_snap_failures,
            missing_elevation:      0,
            unit:                   cfg.output_unit(),
            schema:                 self.schema(),
            records:                Vec::new(),
            breaks:                 None,
            summaries:              Vec::new(),
            od:                     None,
        };

        if let StreamStatus::Cancelled { .. } = status {
            report.status = RunStatus::Cancelled;
            observer.on_run_end(&report);
            return Ok(report);
        }

        // ── ④ Assemble ─────────────────────────────────────────────────────
        observer.on_stage(Stage::Assemble);
        let (records, missing_elevation) = self.assemble(&origin_snaps, &sink.ranks, report.schema.value_columns.len())?;
        report.breaks =
            ClassBreaks::from_composites(records.iter().filter_map(|r| r.scores.as_ref().map(|s| s.composite)), fail);
        report.records = records;
        for scores in report.records.iter_mut().filter_map(|r| r.scores.as_mut()) {
            scores.class = match &report.breaks {
                Some(b) => b.classify(scores.composite, fail),
                None => AccessClass::NoAccess,
            };
        }
        report.missing_elevation = missing_elevation;
        if missing_elevation > 0 {
            log::warn!("{missing_elevation} walk legs had no elevation at one end and were treated as flat");
        }

        // ── ⑤ Summaries ────────────────────────────────────────────────────
        if let Some(spec) = &self.regions {
            observer.on_stage(Stage::Summaries);
            report.summaries =
                summarise(spec, &ctx.origins, &report.records, report.schema.value_columns.len(), fail);
        }

        report.od = sink.matrix.take().map(OdMatrixBuilder::finish).transpose()?;
        observer.on_run_end(&report);
        Ok(report)
    }

    fn open_checkpoint<O: PipelineObserver>(
        &self,
        path: &Path,
        dests: &DestinationSet,
        origin_nodes: &[NodeId],
        sink: &mut RunSink<'_>,
        observer: &mut O,
    ) -> PipelineResult<FxHashSet<NodeId>> {
        let network = &self.ctx.network;
        let dest_ext: Vec<i64> = dests.nodes().iter().map(|&n| network.external_id(n)).collect();
        let checkpoint_err = |message: String| PipelineError::Checkpoint { path: path.display().to_string(), message };
        let fingerprint = self.run_fingerprint();

        let mut done = FxHashSet::default();
        if !path.exists() {
            sink.od_csv = Some(OdCsvWriter::create_with_fingerprint(path, &dest_ext, &fingerprint)?);
            return Ok(done);
        }

        observer.on_stage(Stage::Resume);
        let contents = read_od_csv(path)?;
        match contents.fingerprint.as_deref() {
            None => {
                return Err(checkpoint_err(format!(
                    "no run fingerprint at {}; delete the checkpoint to start over",
                    fingerprint_path(path).display()
                )));
            }
            Some(found) if found != fingerprint => {
                return Err(checkpoint_err(format!(
                    "rows were computed under \"{found}\", this run is \"{fingerprint}\""
                )));
            }
            Some(_) => {}
        }
        if contents.destinations != dest_ext {
            return Err(checkpoint_err(format!(
                "destination columns differ from this run ({} in file, {} expected)",
                contents.destinations.len(),
                dest_ext.len()
            )));
        }

        let origin_set: FxHashSet<NodeId> = origin_nodes.iter().copied().collect();
        for (ext, costs) in &contents.rows {
            let node = network
                .node_id(*ext)
                .filter(|n| origin_set.contains(n))
                .ok_or_else(|| checkpoint_err(format!("row for node {ext}, which is not an origin node of this run")))?;
            if costs.len() != dest_ext.len() {
                return Err(checkpoint_err(format!("row for node {ext} has {} costs", costs.len())));
            }
            if !done.insert(node) {
                return Err(checkpoint_err(format!("duplicate row for node {ext}")));
            }
            sink.record(OdRow { origin: node, costs: costs.clone() })?;
        }
        log::info!("resumed {} of {} origin rows from {}", done.len(), origin_nodes.len(), path.display());

        sink.od_csv = Some(OdCsvWriter::resume(path, &contents)?);
        Ok(done)
    }

    /// Per-origin records in input order, plus the count of walk legs
    /// without elevation.  Classes are left for the caller to fill in.
    fn assemble(
        &self,
        origin_snaps: &[SnapRecord],
        ranks: &FxHashMap<NodeId, Vec<f64>>,
        width: usize,
    ) -> PipelineResult<(Vec<AccessRecord>, usize)> {
        let ctx = &self.ctx;
        let cfg = &ctx.config;
        let fail = cfg.fail_value;
        let n = cfg.num_nearest;
        let walk = WalkModel::from_config(cfg);
        let report = |v: f64| if cfg.report_minutes && fail.is_reached(v) { v / 60.0 } else { v };

        let straight: Vec<Vec<Option<f64>>> = if self.straight_line {
            ctx.categories.iter().map(|c| nearest_straight_line(&ctx.origins, &c.points, cfg.crs)).collect()
        } else {
            Vec::new()
        };

        let mut missing_elevation = 0usize;
        let mut records = Vec::with_capacity(ctx.origins.len());
        for (p, snapped) in ctx.origins.point_ids().zip(origin_snaps) {
            let origin_id = ctx.origins.id(p).to_owned();
            let Ok(s) = snapped else {
                records.push(AccessRecord { point: p, origin_id, scores: None });
                continue;
            };
            let drive = ranks
                .get(&s.node)
                .ok_or_else(|| PipelineError::MissingRow(ctx.network.external_id(s.node)))?;

            let walk_cost = match cfg.weight_attribute {
                WeightAttribute::Time => {
                    let leg = walk.walk_time(
                        s.offset_m,
                        self.elevation.elevation_at(ctx.origins.coord(p)),
                        self.elevation.elevation_at(ctx.network.node_pos[s.node.index()]),
                    );
                    if leg.missing_elevation {
                        missing_elevation += 1;
                    }
                    leg.seconds
                }
                WeightAttribute::Distance => s.offset_m,
            };

            let mut values = Vec::with_capacity(width);
            values.extend(drive.iter().map(|&d| report(d)));
            values.push(report(walk_cost));
            let mm_start = values.len();
            values.extend(drive.iter().map(|&d| report(combine(walk_cost, d, fail))));
            let firsts: Vec<f64> = (0..ctx.categories.len()).map(|c| values[mm_start + c * n]).collect();
            for col in &straight {
                values.push(col[p.index()].unwrap_or(fail.value()));
            }
            let comp = composite(&firsts, fail);
            values.push(comp);

            records.push(AccessRecord {
                point: p,
                origin_id,
                scores: Some(Scores { values, composite: comp, class: AccessClass::NoAccess }),
            });
        }
        Ok((records, missing_elevation))
    }
}
