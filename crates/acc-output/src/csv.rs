//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `accessibility.csv`
//! - `regional_summary.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::AccessWriter;
use crate::{AccessRow, AccessSchema, OutputError, OutputResult, SummaryRow};

/// Writes the accessibility table and regional summary to two CSV files.
pub struct CsvWriter {
    table:     Writer<File>,
    summaries: Writer<File>,
    width:     usize,
    finished:  bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path, schema: &AccessSchema) -> OutputResult<Self> {
        let mut table = Writer::from_path(dir.join("accessibility.csv"))?;
        table.write_record(schema.table_header())?;

        let mut summaries = Writer::from_path(dir.join("regional_summary.csv"))?;
        summaries.write_record(schema.summary_header())?;

        Ok(Self {
            table,
            summaries,
            width: schema.value_columns.len(),
            finished: false,
        })
    }
}

/// Empty field for the missing marker.
pub(crate) fn opt_field(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

impl AccessWriter for CsvWriter {
    fn write_rows(&mut self, rows: &[AccessRow]) -> OutputResult<()> {
        let mut record: Vec<String> = Vec::with_capacity(self.width + 2);
        for row in rows {
            if row.values.len() != self.width {
                return Err(OutputError::Schema { found: row.values.len(), expected: self.width });
            }
            record.clear();
            record.push(row.origin_id.clone());
            record.extend(row.values.iter().map(|&v| opt_field(v)));
            record.push(row.access_class.clone().unwrap_or_default());
            self.table.write_record(&record)?;
        }
        Ok(())
    }

    fn write_summaries(&mut self, rows: &[SummaryRow]) -> OutputResult<()> {
        for row in rows {
            if row.means.len() != self.width {
                return Err(OutputError::Schema { found: row.means.len(), expected: self.width });
            }
            let mut record = vec![
                row.region.clone(),
                row.origins.to_string(),
                row.total_weight.to_string(),
                row.reachable_weight.to_string(),
                row.snap_failed_weight.to_string(),
            ];
            record.extend(row.means.iter().map(|&v| opt_field(v)));
            self.summaries.write_record(&record)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.table.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
