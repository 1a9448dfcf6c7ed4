//! Row and schema types written by output backends.

/// Column layout of one run's accessibility table.
///
/// The table is `origin_id`, then every entry of `value_columns` (all
/// `f64`), then `access_class` (text).  The regional summary is `region`,
/// `origins`, `total_weight`, `reachable_weight`, `snap_failed_weight`, then
/// `mean_{column}` for every value column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSchema {
    pub value_columns: Vec<String>,
}

impl AccessSchema {
    pub fn new(value_columns: Vec<String>) -> Self {
        Self { value_columns }
    }

    /// Full accessibility table header.
    pub fn table_header(&self) -> Vec<String> {
        let mut h = Vec::with_capacity(self.value_columns.len() + 2);
        h.push("origin_id".to_owned());
        h.extend(self.value_columns.iter().cloned());
        h.push("access_class".to_owned());
        h
    }

    /// Full regional summary header.
    pub fn summary_header(&self) -> Vec<String> {
        let mut h: Vec<String> = ["region", "origins", "total_weight", "reachable_weight", "snap_failed_weight"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        h.extend(self.value_columns.iter().map(|c| format!("mean_{c}")));
        h
    }
}

/// One origin's accessibility record.  `None` is the missing marker.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRow {
    pub origin_id:    String,
    pub values:       Vec<Option<f64>>,
    pub access_class: Option<String>,
}

/// Weighted aggregate of the origins in one region.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub region:             String,
    pub origins:            u64,
    pub total_weight:       f64,
    /// Weight of origins whose every category is reachable.
    pub reachable_weight:   f64,
    pub snap_failed_weight: f64,
    /// Weighted mean of each value column over reached cells; `None` when
    /// no origin in the region has a reached value.
    pub means:              Vec<Option<f64>>,
}
