//! Weighted regional aggregation of accessibility records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use acc_core::FailValue;
use acc_network::PointSet;
use acc_output::SummaryRow;

use crate::report::AccessRecord;

/// How origins are grouped and weighted in the regional summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    /// Origin attribute naming the region.
    pub attribute: String,
    /// Numeric origin attribute used as weight (population).  Every origin
    /// weighs 1 when unset.
    #[serde(default)]
    pub weight: Option<String>,
}

/// Region name used for origins without a value in the region attribute.
pub const UNASSIGNED_REGION: &str = "(unassigned)";

#[derive(Default)]
struct Accumulator {
    origins:     u64,
    total:       f64,
    reachable:   f64,
    snap_failed: f64,
    sums:        Vec<f64>,
    weights:     Vec<f64>,
}

/// One [`SummaryRow`] per region, ordered by region name.
///
/// Means are weighted over reached cells only; fail-value cells and
/// origins that failed to snap contribute to neither numerator nor
/// denominator.
pub fn summarise(
    spec: &RegionSpec,
    origins: &PointSet,
    records: &[AccessRecord],
    n_columns: usize,
    fail: FailValue,
) -> Vec<SummaryRow> {
    let mut regions: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut bad_weights = 0usize;
    let mut unassigned = 0usize;

    for record in records {
        let region = match origins.attr(record.point, &spec.attribute) {
            Some(r) if !r.trim().is_empty() => r.trim().to_owned(),
            _ => {
                unassigned += 1;
                UNASSIGNED_REGION.to_owned()
            }
        };
        let weight = match &spec.weight {
            None => 1.0,
            Some(col) => match origins.attr_f64(record.point, col) {
                Some(w) if w.is_finite() && w >= 0.0 => w,
                _ => {
                    bad_weights += 1;
                    0.0
                }
            },
        };

        let acc = regions.entry(region).or_insert_with(|| Accumulator {
            sums: vec![0.0; n_columns],
            weights: vec![0.0; n_columns],
            ..Accumulator::default()
        });
        acc.origins += 1;
        acc.total += weight;

        let Some(scores) = &record.scores else {
            acc.snap_failed += weight;
            continue;
        };
        if fail.is_reached(scores.composite) {
            acc.reachable += weight;
        }
        for (col, &v) in scores.values.iter().enumerate().take(n_columns) {
            if fail.is_reached(v) {
                acc.sums[col] += v * weight;
                acc.weights[col] += weight;
            }
        }
    }

    if unassigned > 0 {
        log::warn!("{unassigned} origins have no {:?} value; grouped as {UNASSIGNED_REGION}", spec.attribute);
    }
    if bad_weights > 0 {
        log::warn!("{bad_weights} origins have a missing or invalid weight; counted with weight 0");
    }

    regions
        .into_iter()
        .map(|(region, acc)| SummaryRow {
            region,
            origins: acc.origins,
            total_weight: acc.total,
            reachable_weight: acc.reachable,
            snap_failed_weight: acc.snap_failed,
            means: acc
                .sums
                .iter()
                .zip(&acc.weights)
                .map(|(&s, &w)| (w > 0.0).then(|| s / w))
                .collect(),
        })
        .collect()
}
