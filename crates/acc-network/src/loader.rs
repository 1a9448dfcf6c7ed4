//! CSV road-network loader.
//!
//! # CSV format
//!
//! Two tables.  Column names are configurable through [`NetworkColumns`];
//! the defaults are shown.  Extra columns are ignored.
//!
//! ```csv
//! id,x,y
//! 101,-66.105,18.466
//! 102,-66.101,18.466
//! ```
//!
//! ```csv
//! source,target,length,highway,oneway
//! 101,102,421.7,residential,false
//! ```
//!
//! **`oneway`** (optional column):
//!
//! | Value                         | Edges added                 |
//! |-------------------------------|-----------------------------|
//! | absent, empty, `false`, `no`, `0` | `source → target` and back |
//! | `true`, `yes`, `1`            | `source → target` only      |
//! | `-1`, `reverse`               | `target → source` only      |
//!
//! `length` is in metres.  An edge row naming a node absent from the node
//! table is a fatal [`NetworkError::GraphIntegrity`] naming the line and id.

use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use acc_core::{Coord, Crs};

use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::speed::SpeedTable;
use crate::{NetworkError, NetworkResult};

// ── Column configuration ──────────────────────────────────────────────────────

/// Header names of the node and edge tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkColumns {
    pub node_id:     String,
    pub node_x:      String,
    pub node_y:      String,
    pub edge_source: String,
    pub edge_target: String,
    pub edge_length: String,
    pub edge_class:  String,
    /// Looked up only if present in the header.
    pub edge_oneway: String,
}

impl Default for NetworkColumns {
    fn default() -> Self {
        Self {
            node_id:     "id".into(),
            node_x:      "x".into(),
            node_y:      "y".into(),
            edge_source: "source".into(),
            edge_target: "target".into(),
            edge_length: "length".into(),
            edge_class:  "highway".into(),
            edge_oneway: "oneway".into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    Both,
    Forward,
    Reverse,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load and build a [`RoadNetwork`] from node and edge CSV files.
pub fn load_network_csv(
    nodes: &Path,
    edges: &Path,
    columns: &NetworkColumns,
    speeds: &SpeedTable,
    crs: Crs,
) -> NetworkResult<RoadNetwork> {
    let node_file = std::fs::File::open(nodes)?;
    let edge_file = std::fs::File::open(edges)?;
    load_network_readers(node_file, edge_file, columns, speeds, crs)
}

/// Like [`load_network_csv`] but accepts any `Read` sources.
pub fn load_network_readers<N: Read, E: Read>(
    nodes: N,
    edges: E,
    columns: &NetworkColumns,
    speeds: &SpeedTable,
    crs: Crs,
) -> NetworkResult<RoadNetwork> {
    let mut builder = RoadNetworkBuilder::new(crs);

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut node_reader = csv::Reader::from_reader(nodes);
    let header = node_reader.headers()?.clone();
    let id_col = column(&header, "node table", &columns.node_id)?;
    let x_col  = column(&header, "node table", &columns.node_x)?;
    let y_col  = column(&header, "node table", &columns.node_y)?;

    let mut known: FxHashSet<i64> = FxHashSet::default();
    for result in node_reader.records() {
        let rec = result?;
        let line = line_of(&rec);
        let id: i64 = parse_field(&rec, id_col, "node table", line)?;
        let x: f64  = parse_field(&rec, x_col, "node table", line)?;
        let y: f64  = parse_field(&rec, y_col, "node table", line)?;
        known.insert(id);
        builder.add_node(id, Coord::new(x, y));
    }

    // ── Edges ─────────────────────────────────────────────────────────────
    let mut edge_reader = csv::Reader::from_reader(edges);
    let header = edge_reader.headers()?.clone();
    let src_col    = column(&header, "edge table", &columns.edge_source)?;
    let dst_col    = column(&header, "edge table", &columns.edge_target)?;
    let len_col    = column(&header, "edge table", &columns.edge_length)?;
    let class_col  = column(&header, "edge table", &columns.edge_class)?;
    let oneway_col = header.iter().position(|h| h == columns.edge_oneway);

    for result in edge_reader.records() {
        let rec = result?;
        let line = line_of(&rec);
        let from: i64 = parse_field(&rec, src_col, "edge table", line)?;
        let to: i64   = parse_field(&rec, dst_col, "edge table", line)?;
        for id in [from, to] {
            if !known.contains(&id) {
                return Err(NetworkError::GraphIntegrity(format!(
                    "edge table line {line}: edge {from} -> {to} references unknown node {id}"
                )));
            }
        }

        let raw_len = rec.get(len_col).unwrap_or_default().trim();
        if raw_len.is_empty() {
            return Err(NetworkError::GraphIntegrity(format!(
                "edge table line {line}: edge {from} -> {to} has no length"
            )));
        }
        let length_m: f64 = parse_field(&rec, len_col, "edge table", line)?;
        let class = rec.get(class_col).unwrap_or_default();

        let direction = match oneway_col {
            Some(c) => parse_oneway(rec.get(c).unwrap_or_default()).ok_or_else(|| NetworkError::Row {
                table: "edge table".into(),
                line,
                message: format!("unrecognised oneway value {:?}", rec.get(c).unwrap_or_default()),
            })?,
            None => Direction::Both,
        };
        match direction {
            Direction::Both    => builder.add_road(from, to, length_m, class),
            Direction::Forward => builder.add_directed_edge(from, to, length_m, class),
            Direction::Reverse => builder.add_directed_edge(to, from, length_m, class),
        };
    }

    log::info!(
        "loaded road network tables: {} nodes, {} directed edges",
        builder.node_count(),
        builder.edge_count()
    );
    builder.build(speeds)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub(crate) fn column(header: &csv::StringRecord, table: &str, name: &str) -> NetworkResult<usize> {
    header.iter().position(|h| h == name).ok_or_else(|| NetworkError::MissingColumn {
        table: table.to_owned(),
        column: name.to_owned(),
    })
}

pub(crate) fn line_of(rec: &csv::StringRecord) -> u64 {
    rec.position().map_or(0, |p| p.line())
}

pub(crate) fn parse_field<T: std::str::FromStr>(
    rec: &csv::StringRecord,
    col: usize,
    table: &str,
    line: u64,
) -> NetworkResult<T>
where
    T::Err: std::fmt::Display,
{
    let raw = rec.get(col).unwrap_or_default().trim();
    raw.parse::<T>().map_err(|e| NetworkError::Row {
        table: table.to_owned(),
        line,
        message: format!("cannot parse {raw:?} in column {col}: {e}"),
    })
}

fn parse_oneway(raw: &str) -> Option<Direction> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" | "f" => Some(Direction::Both),
        "true" | "yes" | "1" | "t"      => Some(Direction::Forward),
        "-1" | "reverse"                => Some(Direction::Reverse),
        _ => None,
    }
}
