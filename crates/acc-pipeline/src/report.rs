//! Results of one pipeline run.

use acc_core::{CostUnit, PointId};
use acc_matrix::OdMatrix;
use acc_output::{AccessRow, AccessSchema, AccessWriter, SummaryRow};

use crate::classes::{AccessClass, ClassBreaks};
use crate::PipelineResult;

/// How a run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped at a chunk boundary.  No records were assembled; rerun with
    /// the same checkpoint to continue.
    Cancelled,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

/// Scores of one snapped origin, laid out as [`RunReport::schema`].
#[derive(Clone, Debug, PartialEq)]
pub struct Scores {
    pub values:    Vec<f64>,
    pub composite: f64,
    pub class:     AccessClass,
}

/// One origin's accessibility.  `scores` is `None` when the origin failed
/// to snap, which is distinct from every facility being unreachable.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessRecord {
    pub point:     PointId,
    pub origin_id: String,
    pub scores:    Option<Scores>,
}

pub struct RunReport {
    pub status:                 RunStatus,
    /// Distinct origin nodes searched in this run.
    pub rows_computed:          usize,
    /// Distinct origin nodes loaded from the checkpoint.
    pub rows_resumed:           usize,
    pub origin_snap_failures:   usize,
    /// `(category name, records that failed to snap)`.
    pub facility_snap_failures: Vec<(String, usize)>,
    /// Walk legs computed without an elevation at one or both ends.
    pub missing_elevation:      usize,
    /// Unit of every cost column.  Straight-line columns are always metres.
    pub unit:                   CostUnit,
    pub schema:                 AccessSchema,
    /// In origin input order.
    pub records:                Vec<AccessRecord>,
    pub breaks:                 Option<ClassBreaks>,
    pub summaries:              Vec<SummaryRow>,
    /// Full OD matrix in the engine's native unit, when retained.
    pub od:                     Option<OdMatrix>,
}

const WRITE_BATCH: usize = 4096;

impl RunReport {
    /// Position of `column` in each record's values.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.schema.value_columns.iter().position(|c| c == column)
    }

    /// Value of `column` for the origin with id `origin_id`.
    ///
    /// Outer `None`: unknown origin or column.  Inner `None`: snap failure.
    pub fn value(&self, origin_id: &str, column: &str) -> Option<Option<f64>> {
        let col = self.column_index(column)?;
        let record = self.records.iter().find(|r| r.origin_id == origin_id)?;
        Some(record.scores.as_ref().map(|s| s.values[col]))
    }

    /// Write records and summaries through `writer`, then finish it.
    pub fn write<W: AccessWriter + ?Sized>(&self, writer: &mut W) -> PipelineResult<()> {
        for batch in self.records.chunks(WRITE_BATCH) {
            let width = self.schema.value_columns.len();
            let rows: Vec<AccessRow> = batch.iter().map(|r| to_row(r, width)).collect();
            writer.write_rows(&rows)?;
        }
        if !self.summaries.is_empty() {
            writer.write_summaries(&self.summaries)?;
        }
        writer.finish()?;
        Ok(())
    }
}

fn to_row(record: &AccessRecord, width: usize) -> AccessRow {
    match &record.scores {
        Some(s) => AccessRow {
            origin_id:    record.origin_id.clone(),
            values:       s.values.iter().copied().map(Some).collect(),
            access_class: Some(s.class.label().to_owned()),
        },
        None => AccessRow {
            origin_id:    record.origin_id.clone(),
            values:       vec![None; width],
            access_class: None,
        },
    }
}
