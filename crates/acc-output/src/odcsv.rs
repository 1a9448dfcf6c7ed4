//! OD matrix CSV: streamed export and resume.
//!
//! # Format
//!
//! ```csv
//! origin_node,101,205,390
//! 17,0,412.5,999999999
//! 18,36.2,380.1,999999999
//! ```
//!
//! The first header field is the reserved row key [`ROW_KEY`]; the remaining
//! fields are destination node ids (external ids).  One row per origin node.
//! Unreachable cells hold the fail value, written in full.
//!
//! # Resume
//!
//! A killed run can leave a partial final line.  [`read_od_csv`] keeps only
//! complete rows and records the byte length they occupy;
//! [`OdCsvWriter::resume`] truncates the file to that length before
//! appending.
//!
//! # Run fingerprint
//!
//! A checkpoint created with [`OdCsvWriter::create_with_fingerprint`] has a
//! one-line sidecar at [`fingerprint_path`] describing the settings its
//! rows were computed under.  [`read_od_csv`] returns it so the caller can
//! refuse rows from a different run.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::{OutputError, OutputResult};

/// Header field naming the row-key column.
pub const ROW_KEY: &str = "origin_node";

/// Sidecar holding the run fingerprint of the OD CSV at `path`.
pub fn fingerprint_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".run");
    PathBuf::from(name)
}

/// Row-at-a-time OD matrix writer.
pub struct OdCsvWriter {
    writer: Writer<File>,
    width:  usize,
    record: Vec<String>,
}

impl OdCsvWriter {
    /// Create (truncating) `path` and write the header.  A stale
    /// fingerprint sidecar is removed.
    pub fn create(path: &Path, destinations: &[i64]) -> OutputResult<Self> {
        match std::fs::remove_file(fingerprint_path(path)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut writer = Writer::from_path(path)?;
        let mut header = Vec::with_capacity(destinations.len() + 1);
        header.push(ROW_KEY.to_owned());
        header.extend(destinations.iter().map(i64::to_string));
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(Self { writer, width: destinations.len(), record: header })
    }

    /// [`create`](Self::create), recording `fingerprint` in the sidecar.
    pub fn create_with_fingerprint(path: &Path, destinations: &[i64], fingerprint: &str) -> OutputResult<Self> {
        let writer = Self::create(path, destinations)?;
        std::fs::write(fingerprint_path(path), format!("{fingerprint}\n"))?;
        Ok(writer)
    }

    /// Reopen a file previously read with [`read_od_csv`] and continue after
    /// its last complete row.
    pub fn resume(path: &Path, contents: &OdCsvContents) -> OutputResult<Self> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.set_len(contents.complete_len)?;
        file.seek(SeekFrom::End(0))?;
        let writer = WriterBuilder::new().has_headers(false).from_writer(file);
        Ok(Self { writer, width: contents.destinations.len(), record: Vec::new() })
    }

    pub fn write_row(&mut self, origin: i64, costs: &[f64]) -> OutputResult<()> {
        if costs.len() != self.width {
            return Err(OutputError::Schema { found: costs.len(), expected: self.width });
        }
        self.record.clear();
        self.record.push(origin.to_string());
        self.record.extend(costs.iter().map(f64::to_string));
        self.writer.write_record(&self.record)?;
        Ok(())
    }

    /// Flush buffered rows to disk.  Called at chunk boundaries so a resumed
    /// run loses at most one chunk.
    pub fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Parsed OD matrix CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct OdCsvContents {
    pub destinations: Vec<i64>,
    pub rows:         Vec<(i64, Vec<f64>)>,
    /// Byte length of the header plus every complete row.
    pub complete_len: u64,
    /// Contents of the sidecar, `None` if the file has none.
    pub fingerprint:  Option<String>,
}

/// Read an OD matrix CSV, dropping an incomplete trailing row.
pub fn read_od_csv(path: &Path) -> OutputResult<OdCsvContents> {
    let file_name = path.display().to_string();
    let format_err = |message: String| OutputError::Format { file: file_name.clone(), message };

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let header = rdr.headers()?.clone();
    if header.get(0) != Some(ROW_KEY) {
        return Err(format_err(format!("first header field must be {ROW_KEY:?}")));
    }
    let destinations: Vec<i64> = header
        .iter()
        .skip(1)
        .map(|h| h.trim().parse::<i64>().map_err(|e| format_err(format!("destination {h:?}: {e}"))))
        .collect::<OutputResult<_>>()?;
    let mut complete_len = rdr.position().byte();

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    let mut dropped = false;
    while rdr.read_record(&mut record)? {
        if dropped {
            return Err(format_err("incomplete row before end of file".into()));
        }
        let parsed: Option<(i64, Vec<f64>)> = (record.len() == destinations.len() + 1)
            .then(|| {
                let origin = record[0].trim().parse::<i64>().ok()?;
                let costs = record
                    .iter()
                    .skip(1)
                    .map(|c| c.trim().parse::<f64>().ok())
                    .collect::<Option<Vec<f64>>>()?;
                Some((origin, costs))
            })
            .flatten();
        match parsed {
            Some(row) => {
                rows.push(row);
                complete_len = rdr.position().byte();
            }
            None => dropped = true,
        }
    }

    // A final row is only trusted if a line terminator follows it.
    if !dropped && !rows.is_empty() && !ends_with_newline(path)? {
        rows.pop();
        complete_len = last_line_start(path, complete_len)?;
        dropped = true;
    }
    if dropped {
        log::warn!("{file_name}: dropped an incomplete trailing row");
    }

    let fingerprint = match std::fs::read_to_string(fingerprint_path(path)) {
        Ok(text) => Some(text.trim().to_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    Ok(OdCsvContents { destinations, rows, complete_len, fingerprint })
}

fn ends_with_newline(path: &Path) -> OutputResult<bool> {
    use std::io::Read;
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Offset just after the last `\n` strictly before `end`.
fn last_line_start(path: &Path, end: u64) -> OutputResult<u64> {
    let bytes = std::fs::read(path)?;
    let end = (end as usize).min(bytes.len());
    let cut = bytes[..end.saturating_sub(1)]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    Ok(cut as u64)
}
