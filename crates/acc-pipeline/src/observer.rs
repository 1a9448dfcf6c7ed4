//! Run observer hooks for progress reporting.

use crate::report::RunReport;

/// Stages of [`Pipeline::run`](crate::Pipeline::run), in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Snap origins and every category onto the network.
    Snap,
    /// Load rows from an existing OD checkpoint.
    Resume,
    /// Stream shortest-path rows through the nearest-rank summariser.
    Costs,
    /// Build per-origin accessibility records and classes.
    Assemble,
    /// Aggregate records by region.
    Summaries,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Snap      => "snap",
            Stage::Resume    => "resume",
            Stage::Costs     => "costs",
            Stage::Assemble  => "assemble",
            Stage::Summaries => "summaries",
        }
    }
}

/// Callbacks invoked by [`Pipeline::run`](crate::Pipeline::run).
///
/// Every method has a no-op default.
///
/// # Example: progress bar hook
///
/// ```rust,ignore
/// struct Percent;
///
/// impl PipelineObserver for Percent {
///     fn on_rows(&mut self, done: usize, total: usize) {
///         eprintln!("{:.0}%", 100.0 * done as f64 / total.max(1) as f64);
///     }
/// }
/// ```
pub trait PipelineObserver {
    /// Called when a stage begins.
    fn on_stage(&mut self, _stage: Stage) {}

    /// Called after every engine chunk with rows done (including resumed
    /// rows) out of the distinct origin-node total.
    fn on_rows(&mut self, _done: usize, _total: usize) {}

    /// Called once when the run ends, cancelled or not.
    fn on_run_end(&mut self, _report: &RunReport) {}
}

/// A [`PipelineObserver`] that does nothing.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Reports stages and progress through `log`.
#[derive(Default)]
pub struct LogObserver {
    last_percent: Option<u32>,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineObserver for LogObserver {
    fn on_stage(&mut self, stage: Stage) {
        log::info!("stage: {}", stage.as_str());
    }

    fn on_rows(&mut self, done: usize, total: usize) {
        let pct = (100 * done / total.max(1)) as u32;
        // One line per 10 %.
        if self.last_percent.is_none_or(|last| pct / 10 > last / 10) {
            log::info!("origin rows: {done}/{total} ({pct}%)");
            self.last_percent = Some(pct);
        }
    }

    fn on_run_end(&mut self, report: &RunReport) {
        log::info!(
            "run {}: {} rows computed, {} resumed, {} origins failed to snap, {} walk legs without elevation",
            report.status.as_str(),
            report.rows_computed,
            report.rows_resumed,
            report.origin_snap_failures,
            report.missing_elevation,
        );
    }
}
