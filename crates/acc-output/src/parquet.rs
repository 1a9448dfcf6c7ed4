//! Parquet output backend (feature `parquet`).
//!
//! Creates two files in the configured output directory:
//! - `accessibility.parquet`
//! - `regional_summary.parquet`
//!
//! Value columns are nullable `Float64`; missing values are nulls.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, StringBuilder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::writer::AccessWriter;
use crate::{AccessRow, AccessSchema, OutputError, OutputResult, SummaryRow};

fn table_schema(schema: &AccessSchema) -> Arc<Schema> {
    let mut fields = vec![Field::new("origin_id", DataType::Utf8, false)];
    fields.extend(schema.value_columns.iter().map(|c| Field::new(c, DataType::Float64, true)));
    fields.push(Field::new("access_class", DataType::Utf8, true));
    Arc::new(Schema::new(fields))
}

fn summary_schema(schema: &AccessSchema) -> Arc<Schema> {
    let mut fields = vec![
        Field::new("region",             DataType::Utf8,    false),
        Field::new("origins",            DataType::UInt64,  false),
        Field::new("total_weight",       DataType::Float64, false),
        Field::new("reachable_weight",   DataType::Float64, false),
        Field::new("snap_failed_weight", DataType::Float64, false),
    ];
    fields.extend(
        schema
            .value_columns
            .iter()
            .map(|c| Field::new(format!("mean_{c}"), DataType::Float64, true)),
    );
    Arc::new(Schema::new(fields))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Nullable `Float64` column `j` of a batch of optional-value rows.
fn float_column<'a>(values: impl Iterator<Item = &'a [Option<f64>]>, j: usize) -> ArrayRef {
    let mut b = Float64Builder::new();
    for row in values {
        b.append_option(row[j]);
    }
    Arc::new(b.finish())
}

/// Writes the accessibility table and regional summary to two Parquet files.
///
/// `finish()` **must** be called to write the Parquet file footer; files
/// written without calling `finish()` cannot be opened by Parquet readers.
pub struct ParquetWriter {
    table:        Option<ArrowWriter<File>>,
    summaries:    Option<ArrowWriter<File>>,
    table_schema: Arc<Schema>,
    summ_schema:  Arc<Schema>,
    width:        usize,
}

impl ParquetWriter {
    /// Create both Parquet files in `dir`.
    pub fn new(dir: &Path, schema: &AccessSchema) -> OutputResult<Self> {
        let table_schema = table_schema(schema);
        let summ_schema = summary_schema(schema);

        let table = ArrowWriter::try_new(
            File::create(dir.join("accessibility.parquet"))?,
            Arc::clone(&table_schema),
            Some(snappy_props()),
        )?;
        let summaries = ArrowWriter::try_new(
            File::create(dir.join("regional_summary.parquet"))?,
            Arc::clone(&summ_schema),
            Some(snappy_props()),
        )?;

        Ok(Self {
            table: Some(table),
            summaries: Some(summaries),
            table_schema,
            summ_schema,
            width: schema.value_columns.len(),
        })
    }
}

impl AccessWriter for ParquetWriter {
    fn write_rows(&mut self, rows: &[AccessRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.table.as_mut() else {
            return Ok(());
        };
        if let Some(bad) = rows.iter().find(|r| r.values.len() != self.width) {
            return Err(OutputError::Schema { found: bad.values.len(), expected: self.width });
        }

        let mut ids = StringBuilder::new();
        let mut classes = StringBuilder::new();
        for row in rows {
            ids.append_value(&row.origin_id);
            classes.append_option(row.access_class.as_deref());
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.width + 2);
        columns.push(Arc::new(ids.finish()));
        for j in 0..self.width {
            columns.push(float_column(rows.iter().map(|r| r.values.as_slice()), j));
        }
        columns.push(Arc::new(classes.finish()));

        let batch = RecordBatch::try_new(Arc::clone(&self.table_schema), columns)?;
        writer.write(&batch)?;
        Ok(())
    }

    fn write_summaries(&mut self, rows: &[SummaryRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.summaries.as_mut() else {
            return Ok(());
        };
        if let Some(bad) = rows.iter().find(|r| r.means.len() != self.width) {
            return Err(OutputError::Schema { found: bad.means.len(), expected: self.width });
        }

        let mut regions   = StringBuilder::new();
        let mut origins   = UInt64Builder::new();
        let mut total     = Float64Builder::new();
        let mut reachable = Float64Builder::new();
        let mut failed    = Float64Builder::new();
        for row in rows {
            regions.append_value(&row.region);
            origins.append_value(row.origins);
            total.append_value(row.total_weight);
            reachable.append_value(row.reachable_weight);
            failed.append_value(row.snap_failed_weight);
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(regions.finish()),
            Arc::new(origins.finish()),
            Arc::new(total.finish()),
            Arc::new(reachable.finish()),
            Arc::new(failed.finish()),
        ];
        for j in 0..self.width {
            columns.push(float_column(rows.iter().map(|r| r.means.as_slice()), j));
        }

        let batch = RecordBatch::try_new(Arc::clone(&self.summ_schema), columns)?;
        writer.write(&batch)?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if let Some(w) = self.table.take() {
            w.close()?;
        }
        if let Some(w) = self.summaries.take() {
            w.close()?;
        }
        Ok(())
    }
}
