//! The drivable road graph and its builder.
//!
//! # Data layout
//!
//! Outgoing edges are stored compressed-sparse-row.  The edges leaving
//! node `n` are the range:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length_m`, `edge_time_s`,
//! `edge_class`) are sorted by source node and indexed by `EdgeId`.
//!
//! # Node numbering
//!
//! Nodes are added with their external id (the id used by the source data).
//! `build()` assigns dense `NodeId`s in ascending external-id order, so "the
//! lowest node id" means the same thing on both sides of the mapping.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over the CRS metric embedding of each node
//! ([`Crs::embed`]).  Nearest-neighbour order in the embedding equals true
//! distance order, for geographic and projected coordinates alike.

use std::hash::{Hash, Hasher};

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::{FxHashMap, FxHasher};

use acc_core::{Coord, Crs, EdgeId, NodeId, WeightAttribute};

use crate::speed::{primary_class, SpeedTable};
use crate::{NetworkError, NetworkResult};

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f64; 3],
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph with per-edge distance and time, and an R-tree over
/// node positions for snapping.
///
/// Columns are `pub` so the cost engine can index them directly.  Only
/// [`RoadNetworkBuilder::build`] produces a consistent value.
#[derive(Debug)]
pub struct RoadNetwork {
    /// Coordinate reference system of `node_pos`.
    pub crs: Crs,

    // ── Node data ─────────────────────────────────────────────────────────
    /// Position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<Coord>,

    /// External id of each node, strictly ascending.  Indexed by `NodeId`.
    pub node_external: Vec<i64>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge columns, indexed by EdgeId ───────────────────────────────────
    pub edge_from: Vec<NodeId>,
    pub edge_to: Vec<NodeId>,

    /// Length of each edge in metres.  Always finite and positive.
    pub edge_length_m: Vec<f64>,

    /// Travel time in seconds, `length / speed(classification)`.  Always
    /// finite and positive.
    pub edge_time_s: Vec<f64>,

    /// Index into [`classes`](Self::classes) for each edge.
    pub edge_class: Vec<u16>,

    /// Distinct normalised classifications, in first-seen order.
    pub classes: Vec<String>,

    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// `true` if `node` indexes a node of this graph.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.node_pos.len()
    }

    // ── Id mapping ────────────────────────────────────────────────────────

    /// Internal id of the node with external id `external`.
    pub fn node_id(&self, external: i64) -> Option<NodeId> {
        self.node_external
            .binary_search(&external)
            .ok()
            .map(|i| NodeId(i as u32))
    }

    /// External id of `node`.
    #[inline]
    pub fn external_id(&self, node: NodeId) -> i64 {
        self.node_external[node.index()]
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    /// Cost of traversing `edge` under `attribute`: metres or seconds.
    #[inline]
    pub fn edge_weight(&self, edge: EdgeId, attribute: WeightAttribute) -> f64 {
        match attribute {
            WeightAttribute::Distance => self.edge_length_m[edge.index()],
            WeightAttribute::Time     => self.edge_time_s[edge.index()],
        }
    }

    /// Normalised classification of `edge`.
    pub fn edge_classification(&self, edge: EdgeId) -> &str {
        &self.classes[self.edge_class[edge.index()] as usize]
    }

    /// Hash of the node ids and of every edge's endpoints, length, and
    /// travel time.  Two networks that route identically hash equally.
    pub fn content_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        self.node_external.hash(&mut h);
        for e in 0..self.edge_count() {
            h.write_u32(self.edge_from[e].0);
            h.write_u32(self.edge_to[e].0);
            h.write_u64(self.edge_length_m[e].to_bits());
            h.write_u64(self.edge_time_s[e].to_bits());
        }
        h.finish()
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nodes in ascending distance from `pos`, each with its squared distance
    /// in the CRS embedding.  Empty if the network has no nodes.
    pub fn nearest_nodes(&self, pos: Coord) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.spatial_idx
            .nearest_neighbor_iter_with_distance_2(&self.crs.embed(pos))
            .map(|(e, d2)| (e.id, d2))
    }

    /// Distance in metres from `pos` to `node`.
    #[inline]
    pub fn offset_m(&self, pos: Coord, node: NodeId) -> f64 {
        self.crs.distance_m(pos, self.node_pos[node.index()])
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Collects nodes and roads by external id; [`build`](Self::build) validates
/// them and produces a [`RoadNetwork`].
///
/// The builder accepts nodes and directed edges in any order, keyed by
/// external node id.  Nothing is validated until `build()`.
///
/// # Example
///
/// ```
/// use acc_core::{Coord, Crs};
/// use acc_network::{RoadNetworkBuilder, SpeedTable};
///
/// let mut b = RoadNetworkBuilder::new(Crs::projected_metres());
/// b.add_node(10, Coord::new(0.0, 0.0));
/// b.add_node(20, Coord::new(100.0, 0.0));
/// b.add_road(10, 20, 100.0, "residential");
/// let net = b.build(&SpeedTable::osm_default()).unwrap();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    crs:       Crs,
    nodes:     Vec<(i64, Coord)>,
    raw_edges: Vec<RawEdge>,
    segments:  usize,
}

struct RawEdge {
    segment:  usize,
    from:     i64,
    to:       i64,
    length_m: f64,
    class:    String,
}

impl RoadNetworkBuilder {
    pub fn new(crs: Crs) -> Self {
        Self { crs, nodes: Vec::new(), raw_edges: Vec::new(), segments: 0 }
    }

    /// Pre-allocate for the expected number of nodes and directed edges.
    pub fn with_capacity(crs: Crs, nodes: usize, edges: usize) -> Self {
        Self {
            crs,
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
            segments:  0,
        }
    }

    pub fn add_node(&mut self, external_id: i64, pos: Coord) {
        self.nodes.push((external_id, pos));
    }

    /// Add a **directed** edge.  Returns the segment number used in error
    /// messages.
    pub fn add_directed_edge(&mut self, from: i64, to: i64, length_m: f64, class: &str) -> usize {
        let segment = self.next_segment();
        self.push_edge(segment, from, to, length_m, class);
        segment
    }

    /// Add edges in **both directions** for a two-way road segment.
    pub fn add_road(&mut self, a: i64, b: i64, length_m: f64, class: &str) -> usize {
        let segment = self.next_segment();
        self.push_edge(segment, a, b, length_m, class);
        self.push_edge(segment, b, a, length_m, class);
        segment
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    fn next_segment(&mut self) -> usize {
        let s = self.segments;
        self.segments += 1;
        s
    }

    fn push_edge(&mut self, segment: usize, from: i64, to: i64, length_m: f64, class: &str) {
        self.raw_edges.push(RawEdge { segment, from, to, length_m, class: class.to_owned() });
    }

    /// Consume the builder, validate, derive travel times, and produce a
    /// [`RoadNetwork`].
    ///
    /// # Errors
    ///
    /// - [`NetworkError::GraphIntegrity`] for duplicate node ids, edges
    ///   referencing unknown nodes, and non-positive or non-finite lengths.
    /// - [`NetworkError::UnknownClassification`] when an edge class has no
    ///   speed and `speeds` has no default.
    /// - [`NetworkError::Core`] for node coordinates invalid in the CRS.
    pub fn build(self, speeds: &SpeedTable) -> NetworkResult<RoadNetwork> {
        let crs = self.crs;

        // ── Nodes: sort by external id, reject duplicates ────────────────
        let mut nodes = self.nodes;
        nodes.sort_unstable_by_key(|&(ext, _)| ext);
        if let Some(w) = nodes.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(NetworkError::GraphIntegrity(format!("duplicate node id {}", w[0].0)));
        }
        for &(_, pos) in &nodes {
            crs.validate(pos)?;
        }
        let node_external: Vec<i64> = nodes.iter().map(|&(ext, _)| ext).collect();
        let node_pos: Vec<Coord> = nodes.iter().map(|&(_, pos)| pos).collect();
        let node_count = node_pos.len();

        let lookup = |ext: i64, e: &RawEdge| -> NetworkResult<NodeId> {
            node_external
                .binary_search(&ext)
                .map(|i| NodeId(i as u32))
                .map_err(|_| {
                    NetworkError::GraphIntegrity(format!(
                        "segment {} ({} -> {}) references unknown node {ext}",
                        e.segment, e.from, e.to
                    ))
                })
        };

        // ── Edges: resolve ids, validate lengths, derive times ───────────
        let mut class_index: FxHashMap<String, u16> = FxHashMap::default();
        let mut classes: Vec<String> = Vec::new();
        let mut resolved: Vec<(NodeId, NodeId, f64, f64, u16)> = Vec::with_capacity(self.raw_edges.len());

        for e in &self.raw_edges {
            let from = lookup(e.from, e)?;
            let to   = lookup(e.to, e)?;
            if !(e.length_m.is_finite() && e.length_m > 0.0) {
                return Err(NetworkError::GraphIntegrity(format!(
                    "segment {} ({} -> {}) has invalid length {}",
                    e.segment, e.from, e.to, e.length_m
                )));
            }

            let class = primary_class(&e.class);
            let kmh = speeds.speed_for(class).ok_or_else(|| NetworkError::UnknownClassification {
                classification: class.to_owned(),
                segment: e.segment,
                from: e.from,
                to: e.to,
            })?;
            let time_s = e.length_m / (kmh / 3.6);

            let cls = match class_index.get(class) {
                Some(&c) => c,
                None => {
                    let c = u16::try_from(classes.len()).map_err(|_| {
                        NetworkError::GraphIntegrity("more than 65535 distinct edge classifications".into())
                    })?;
                    classes.push(class.to_owned());
                    class_index.insert(class.to_owned(), c);
                    c
                }
            };

            resolved.push((from, to, e.length_m, time_s, cls));
        }

        // Sort edges by (source, target) for CSR construction.  The sort is
        // stable so parallel edges keep input order.
        resolved.sort_by_key(|&(from, to, ..)| (from, to));
        let edge_count = resolved.len();

        let edge_from:     Vec<NodeId> = resolved.iter().map(|r| r.0).collect();
        let edge_to:       Vec<NodeId> = resolved.iter().map(|r| r.1).collect();
        let edge_length_m: Vec<f64>    = resolved.iter().map(|r| r.2).collect();
        let edge_time_s:   Vec<f64>    = resolved.iter().map(|r| r.3).collect();
        let edge_class:    Vec<u16>    = resolved.iter().map(|r| r.4).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for from in &edge_from {
            node_out_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        // Bulk-load R-tree for O(N log N) construction.
        let entries: Vec<NodeEntry> = node_pos
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: crs.embed(pos), id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        log::debug!(
            "road network built: {node_count} nodes, {edge_count} directed edges, {} classifications",
            classes.len()
        );

        Ok(RoadNetwork {
            crs,
            node_pos,
            node_external,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_time_s,
            edge_class,
            classes,
            spatial_idx,
        })
    }
}
