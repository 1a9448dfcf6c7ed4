//! Many-to-many shortest-path costs.
//!
//! One Dijkstra search per origin, shared by every destination, stopping as
//! soon as the last destination is settled.  Weights are non-negative, so a
//! settled node's cost is final.
//!
//! # Determinism
//!
//! The heap orders entries by `(cost, node)`: equal-cost nodes settle in
//! ascending `NodeId` order regardless of insertion history, and row order
//! always follows the order of the origins passed in.
//!
//! # Search cutoff
//!
//! With `max_search_distance` set, a destination whose shortest path (by the
//! chosen weight) is longer than the cutoff, in metres, is reported as
//! unreachable.  The path length is tracked alongside the cost.  Under the
//! distance weight cost *is* length, so the search also stops expanding once
//! the frontier passes the cutoff.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use acc_core::{AccessConfig, FailValue, NodeId, WeightAttribute};
use acc_network::RoadNetwork;

use crate::{CancelToken, MatrixError, MatrixResult, OdMatrix, OdMatrixBuilder, OdRow, RowSink, StreamStatus};

// ── Heap entry ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct State {
    cost: f64,
    node: NodeId,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by (cost, node): reversed from standard BinaryHeap.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── PathCost ──────────────────────────────────────────────────────────────────

/// Outcome of a single-pair query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathCost {
    Reached(f64),
    Unreachable,
}

impl PathCost {
    /// The reached cost, or `fail` for unreachable.
    pub fn or_fail(self, fail: FailValue) -> f64 {
        match self {
            PathCost::Reached(c) => c,
            PathCost::Unreachable => fail.value(),
        }
    }
}

// ── DestinationSet ────────────────────────────────────────────────────────────

/// Sorted destination columns plus a dense node → column map.
pub struct DestinationSet {
    nodes:  Vec<NodeId>,
    column: Vec<u32>,
}

const NOT_A_DESTINATION: u32 = u32::MAX;

impl DestinationSet {
    /// Deduplicate and sort `nodes`, checking each is in `network`.
    pub fn new(network: &RoadNetwork, nodes: &[NodeId]) -> MatrixResult<Self> {
        let mut sorted = nodes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut column = vec![NOT_A_DESTINATION; network.node_count()];
        for (col, &d) in sorted.iter().enumerate() {
            if !network.contains(d) {
                return Err(MatrixError::NodeNotInGraph { node: d, role: "destination" });
            }
            column[d.index()] = col as u32;
        }
        Ok(Self { nodes: sorted, column })
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    fn column_of(&self, node: NodeId) -> Option<usize> {
        match self.column[node.index()] {
            NOT_A_DESTINATION => None,
            c => Some(c as usize),
        }
    }
}

// ── Per-search scratch ────────────────────────────────────────────────────────

/// Reusable buffers for one search.  Only touched entries are reset between
/// origins.
struct SearchScratch {
    cost:    Vec<f64>,
    length:  Vec<f64>,
    touched: Vec<NodeId>,
    heap:    BinaryHeap<State>,
}

impl SearchScratch {
    fn new(node_count: usize) -> Self {
        Self {
            cost:    vec![f64::INFINITY; node_count],
            length:  vec![f64::INFINITY; node_count],
            touched: Vec::new(),
            heap:    BinaryHeap::new(),
        }
    }

    fn reset(&mut self) {
        for n in self.touched.drain(..) {
            self.cost[n.index()] = f64::INFINITY;
            self.length[n.index()] = f64::INFINITY;
        }
        self.heap.clear();
    }

    #[inline]
    fn relax(&mut self, node: NodeId, cost: f64, length: f64) -> bool {
        let i = node.index();
        if cost < self.cost[i] {
            if self.cost[i] == f64::INFINITY {
                self.touched.push(node);
            }
            self.cost[i] = cost;
            self.length[i] = length;
            self.heap.push(State { cost, node });
            true
        } else {
            false
        }
    }
}

// ── CostEngine ────────────────────────────────────────────────────────────────

/// Shortest-path cost computation over one network with one weight.
pub struct CostEngine<'a> {
    network:        &'a RoadNetwork,
    weight:         WeightAttribute,
    fail:           FailValue,
    max_search_m:   Option<f64>,
}

impl<'a> CostEngine<'a> {
    pub fn new(network: &'a RoadNetwork, weight: WeightAttribute, fail: FailValue) -> Self {
        Self { network, weight, fail, max_search_m: None }
    }

    /// Engine configured from the run config's weight, fail value, and
    /// search cutoff.
    pub fn from_config(network: &'a RoadNetwork, config: &AccessConfig) -> Self {
        Self::new(network, config.weight_attribute, config.fail_value)
            .with_max_search_distance(config.max_search_distance)
    }

    pub fn with_max_search_distance(mut self, metres: Option<f64>) -> Self {
        self.max_search_m = metres;
        self
    }

    pub fn weight(&self) -> WeightAttribute {
        self.weight
    }

    pub fn fail_value(&self) -> FailValue {
        self.fail
    }

    /// Cost of the shortest path `from → to`.
    pub fn shortest_cost(&self, from: NodeId, to: NodeId) -> MatrixResult<PathCost> {
        let dests = DestinationSet::new(self.network, &[to])?;
        let mut scratch = SearchScratch::new(self.network.node_count());
        let row = self.search(from, &dests, &mut scratch)?;
        Ok(match self.fail.reached(row.costs[0]) {
            Some(c) => PathCost::Reached(c),
            None => PathCost::Unreachable,
        })
    }

    /// Full matrix over the distinct, sorted `origins` × `destinations`.
    pub fn shortest_costs(&self, origins: &[NodeId], destinations: &[NodeId]) -> MatrixResult<OdMatrix> {
        let mut origins = origins.to_vec();
        origins.sort_unstable();
        origins.dedup();

        let dests = DestinationSet::new(self.network, destinations)?;
        let mut builder = OdMatrixBuilder::new(dests.nodes().to_vec(), self.weight.native_unit());
        self.stream_rows(&origins, &dests, origins.len().max(1), &CancelToken::new(), &mut builder, |_| {})?;
        builder.finish()
    }

    /// Compute one row per origin and hand each to `sink`, in the order of
    /// `origins`.
    ///
    /// Work proceeds in chunks of `chunk_rows` origins.  `cancel` is checked
    /// before each chunk and `on_chunk` is called after each with the number
    /// of rows delivered so far.
    pub fn stream_rows<S: RowSink>(
        &self,
        origins: &[NodeId],
        dests: &DestinationSet,
        chunk_rows: usize,
        cancel: &CancelToken,
        sink: &mut S,
        mut on_chunk: impl FnMut(usize),
    ) -> Result<StreamStatus, S::Error> {
        let mut delivered = 0usize;
        #[cfg(not(feature = "parallel"))]
        let mut scratch = SearchScratch::new(self.network.node_count());

        for chunk in origins.chunks(chunk_rows.max(1)) {
            if cancel.is_cancelled() {
                log::info!("cost engine cancelled after {delivered} rows");
                return Ok(StreamStatus::Cancelled { rows: delivered });
            }

            #[cfg(feature = "parallel")]
            let rows: Vec<MatrixResult<OdRow>> = {
                use rayon::prelude::*;
                let n = self.network.node_count();
                chunk
                    .par_iter()
                    .map_init(|| SearchScratch::new(n), |scratch, &o| self.search(o, dests, scratch))
                    .collect()
            };

            #[cfg(not(feature = "parallel"))]
            let rows: Vec<MatrixResult<OdRow>> =
                chunk.iter().map(|&o| self.search(o, dests, &mut scratch)).collect();

            for row in rows {
                sink.accept(row?)?;
                delivered += 1;
            }
            log::debug!("cost engine: {delivered}/{} rows", origins.len());
            on_chunk(delivered);
        }

        Ok(StreamStatus::Completed { rows: delivered })
    }

    // ── Dijkstra ──────────────────────────────────────────────────────────

    fn search(&self, origin: NodeId, dests: &DestinationSet, scratch: &mut SearchScratch) -> MatrixResult<OdRow> {
        if !self.network.contains(origin) {
            return Err(MatrixError::NodeNotInGraph { node: origin, role: "origin" });
        }

        let fail = self.fail.value();
        let mut costs = vec![fail; dests.len()];
        let mut remaining = dests.len();
        let frontier_cap = match self.weight {
            WeightAttribute::Distance => self.max_search_m.unwrap_or(f64::INFINITY),
            WeightAttribute::Time => f64::INFINITY,
        };

        scratch.reset();
        scratch.relax(origin, 0.0, 0.0);

        while let Some(State { cost, node }) = scratch.heap.pop() {
            // Skip stale heap entries.
            if cost > scratch.cost[node.index()] {
                continue;
            }
            if cost > frontier_cap {
                break;
            }

            if let Some(col) = dests.column_of(node) {
                let within = self.max_search_m.is_none_or(|m| scratch.length[node.index()] <= m);
                if within {
                    if !self.fail.is_reached(cost) {
                        return Err(MatrixError::CostReachesFail {
                            origin,
                            destination: node,
                            cost,
                            fail,
                        });
                    }
                    costs[col] = cost;
                }
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }

            let length = scratch.length[node.index()];
            for edge in self.network.out_edges(node) {
                let next = self.network.edge_to[edge.index()];
                let next_cost = cost + self.network.edge_weight(edge, self.weight);
                let next_len = length + self.network.edge_length_m[edge.index()];
                scratch.relax(next, next_cost, next_len);
            }
        }

        Ok(OdRow { origin, costs })
    }
}

/// Free-function form of [`CostEngine::shortest_costs`].
pub fn shortest_costs(
    network: &RoadNetwork,
    origins: &[NodeId],
    destinations: &[NodeId],
    weight: WeightAttribute,
    fail: FailValue,
) -> MatrixResult<OdMatrix> {
    CostEngine::new(network, weight, fail).shortest_costs(origins, destinations)
}
