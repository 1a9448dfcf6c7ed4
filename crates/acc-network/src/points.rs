//! Point sets: origins and facility categories.
//!
//! A [`PointSet`] is an ordered table of records, each with a unique string
//! id, a coordinate in the run CRS, and free-form attributes (name,
//! population, region, ...) carried through to summaries.  Storage is
//! columnar; `PointId(i)` is the position of a record in input order.
//!
//! # CSV format
//!
//! ```csv
//! id,x,y,name,population,region
//! v001,-66.104,18.467,Barrio A,1250,San Juan
//! ```
//!
//! The id/x/y header names are configurable through [`PointColumns`]; every
//! other column becomes an attribute.

use std::io::Read;
use std::path::Path;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use acc_core::{Coord, Crs, PointId};

use crate::loader::{column, line_of, parse_field};
use crate::{NetworkError, NetworkResult};

// ── PointSet ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct PointSet {
    name:       String,
    ids:        Vec<String>,
    coords:     Vec<Coord>,
    attr_names: Vec<String>,
    /// Row-major: `attrs[point][attr]`.
    attrs:      Vec<Vec<String>>,
    by_id:      FxHashMap<String, PointId>,
}

impl PointSet {
    /// Empty set with the given attribute columns.
    pub fn new(name: impl Into<String>, attr_names: Vec<String>) -> Self {
        Self { name: name.into(), attr_names, ..Self::default() }
    }

    /// Append a record.  `attrs` must match `attr_names` in length.
    ///
    /// # Errors
    ///
    /// [`NetworkError::DuplicatePoint`] if `id` is already present.
    pub fn push(&mut self, id: impl Into<String>, coord: Coord, attrs: Vec<String>) -> NetworkResult<PointId> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(NetworkError::DuplicatePoint { set: self.name.clone(), id });
        }
        if attrs.len() != self.attr_names.len() {
            return Err(NetworkError::GraphIntegrity(format!(
                "point {id:?} in {:?} has {} attributes, expected {}",
                self.name,
                attrs.len(),
                self.attr_names.len()
            )));
        }
        let pid = PointId(self.ids.len() as u32);
        self.by_id.insert(id.clone(), pid);
        self.ids.push(id);
        self.coords.push(coord);
        self.attrs.push(attrs);
        Ok(pid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, p: PointId) -> &str {
        &self.ids[p.index()]
    }

    pub fn coord(&self, p: PointId) -> Coord {
        self.coords[p.index()]
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn find(&self, id: &str) -> Option<PointId> {
        self.by_id.get(id).copied()
    }

    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    /// Raw attribute value, `None` if the column does not exist.
    pub fn attr(&self, p: PointId, name: &str) -> Option<&str> {
        let col = self.attr_names.iter().position(|a| a == name)?;
        Some(self.attrs[p.index()][col].as_str())
    }

    /// Attribute parsed as a number; `None` if missing, empty, or not numeric.
    pub fn attr_f64(&self, p: PointId, name: &str) -> Option<f64> {
        self.attr(p, name)?.trim().parse().ok()
    }

    pub fn point_ids(&self) -> impl ExactSizeIterator<Item = PointId> + use<> {
        (0..self.ids.len() as u32).map(PointId)
    }

    /// Build a nearest-point index over this set.
    pub fn spatial_index(&self, crs: Crs) -> PointIndex {
        PointIndex::new(&self.coords, crs)
    }
}

// ── CSV loading ───────────────────────────────────────────────────────────────

/// Header names of the id and coordinate columns of a point table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointColumns {
    pub id: String,
    pub x:  String,
    pub y:  String,
}

impl Default for PointColumns {
    fn default() -> Self {
        Self { id: "id".into(), x: "x".into(), y: "y".into() }
    }
}

/// Load a point set from a CSV file.
pub fn load_points_csv(path: &Path, name: &str, columns: &PointColumns) -> NetworkResult<PointSet> {
    let file = std::fs::File::open(path)?;
    load_points_reader(file, name, columns)
}

/// Like [`load_points_csv`] but accepts any `Read` source.
///
/// Coordinates are parsed but not range-checked; invalid ones surface as
/// per-record snap failures.
pub fn load_points_reader<R: Read>(reader: R, name: &str, columns: &PointColumns) -> NetworkResult<PointSet> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let header = csv_reader.headers()?.clone();
    let table = format!("point set {name:?}");
    let id_col = column(&header, &table, &columns.id)?;
    let x_col  = column(&header, &table, &columns.x)?;
    let y_col  = column(&header, &table, &columns.y)?;

    let attr_cols: Vec<usize> = (0..header.len())
        .filter(|c| ![id_col, x_col, y_col].contains(c))
        .collect();
    let attr_names = attr_cols.iter().map(|&c| header[c].to_owned()).collect();

    let mut set = PointSet::new(name, attr_names);
    for result in csv_reader.records() {
        let rec = result?;
        let line = line_of(&rec);
        let id = rec.get(id_col).unwrap_or_default().trim().to_owned();
        let x: f64 = parse_field(&rec, x_col, &table, line)?;
        let y: f64 = parse_field(&rec, y_col, &table, line)?;
        let attrs = attr_cols
            .iter()
            .map(|&c| rec.get(c).unwrap_or_default().to_owned())
            .collect();
        set.push(id, Coord::new(x, y), attrs)?;
    }

    log::info!("loaded point set {name:?}: {} records", set.len());
    Ok(set)
}

// ── PointIndex ────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct PointEntry {
    point: [f64; 3],
    id: PointId,
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for PointEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// R-tree over the valid coordinates of a point set, for straight-line
/// nearest-point queries.  Records with invalid coordinates are left out.
pub struct PointIndex {
    crs:    Crs,
    coords: Vec<Coord>,
    tree:   RTree<PointEntry>,
}

impl PointIndex {
    pub fn new(coords: &[Coord], crs: Crs) -> Self {
        let entries: Vec<PointEntry> = coords
            .iter()
            .enumerate()
            .filter(|(_, c)| crs.validate(**c).is_ok())
            .map(|(i, &c)| PointEntry { point: crs.embed(c), id: PointId(i as u32) })
            .collect();
        Self { crs, coords: coords.to_vec(), tree: RTree::bulk_load(entries) }
    }

    /// Nearest indexed point to `pos` and its distance in metres.
    pub fn nearest(&self, pos: Coord) -> Option<(PointId, f64)> {
        if self.crs.validate(pos).is_err() {
            return None;
        }
        self.tree
            .nearest_neighbor(&self.crs.embed(pos))
            .map(|e| (e.id, self.crs.distance_m(pos, self.coords[e.id.index()])))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
