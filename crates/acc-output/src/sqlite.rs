//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `accessibility.db` file in the configured output
//! directory with two tables, `accessibility` and `regional_summary`.
//! Value columns are `REAL`; missing values are `NULL`.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::Connection;

use crate::writer::AccessWriter;
use crate::{AccessRow, AccessSchema, OutputError, OutputResult, SummaryRow};

/// Writes the accessibility table and regional summary to an SQLite database.
pub struct SqliteWriter {
    conn:         Connection,
    insert_row:   String,
    insert_summ:  String,
    width:        usize,
    finished:     bool,
}

/// Double-quote an identifier; column names such as `hospital-1st` are not
/// bare SQL identifiers.
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

impl SqliteWriter {
    /// Create (replacing any previous run's tables) `accessibility.db` in
    /// `dir`.
    pub fn new(dir: &Path, schema: &AccessSchema) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("accessibility.db"))?;

        let value_defs: String = schema
            .value_columns
            .iter()
            .map(|c| format!(",\n    {} REAL", quote(c)))
            .collect();
        let mean_defs: String = schema
            .value_columns
            .iter()
            .map(|c| format!(",\n    {} REAL", quote(&format!("mean_{c}"))))
            .collect();

        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             DROP TABLE IF EXISTS accessibility;
             DROP TABLE IF EXISTS regional_summary;
             CREATE TABLE accessibility (
                 origin_id TEXT PRIMARY KEY{value_defs},
                 access_class TEXT
             );
             CREATE TABLE regional_summary (
                 region TEXT PRIMARY KEY,
                 origins INTEGER NOT NULL,
                 total_weight REAL NOT NULL,
                 reachable_weight REAL NOT NULL,
                 snap_failed_weight REAL NOT NULL{mean_defs}
             );"
        ))?;

        let table_cols: Vec<String> = schema.table_header().iter().map(|c| quote(c)).collect();
        let summ_cols: Vec<String> = schema.summary_header().iter().map(|c| quote(c)).collect();
        let insert_row = format!(
            "INSERT INTO accessibility ({}) VALUES ({})",
            table_cols.join(", "),
            placeholders(table_cols.len())
        );
        let insert_summ = format!(
            "INSERT INTO regional_summary ({}) VALUES ({})",
            summ_cols.join(", "),
            placeholders(summ_cols.len())
        );

        Ok(Self { conn, insert_row, insert_summ, width: schema.value_columns.len(), finished: false })
    }
}

fn real(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

impl AccessWriter for SqliteWriter {
    fn write_rows(&mut self, rows: &[AccessRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_row)?;
            for row in rows {
                if row.values.len() != self.width {
                    return Err(OutputError::Schema { found: row.values.len(), expected: self.width });
                }
                let mut params: Vec<Value> = Vec::with_capacity(self.width + 2);
                params.push(Value::Text(row.origin_id.clone()));
                params.extend(row.values.iter().map(|&v| real(v)));
                params.push(row.access_class.clone().map_or(Value::Null, Value::Text));
                stmt.execute(rusqlite::params_from_iter(params))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_summaries(&mut self, rows: &[SummaryRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_summ)?;
            for row in rows {
                if row.means.len() != self.width {
                    return Err(OutputError::Schema { found: row.means.len(), expected: self.width });
                }
                let mut params: Vec<Value> = vec![
                    Value::Text(row.region.clone()),
                    Value::Integer(row.origins as i64),
                    Value::Real(row.total_weight),
                    Value::Real(row.reachable_weight),
                    Value::Real(row.snap_failed_weight),
                ];
                params.extend(row.means.iter().map(|&v| real(v)));
                stmt.execute(rusqlite::params_from_iter(params))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
