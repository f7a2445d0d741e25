//! The graph model that is mutated and fed to the algorithms under test.
//!
//! A [`Graph`] is a small labeled multigraph over `u32` node ids. Ids need not
//! be contiguous. Every edge may carry an optional `f64` weight which is
//! allowed to be negative, zero or `NaN`: those are exactly the inputs that
//! shake out bugs in weighted algorithms.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A node identifier.
pub type NodeId = u32;

/// A single edge.
///
/// For undirected graphs `source` and `target` are interchangeable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// The edge's first endpoint.
    pub source: NodeId,
    /// The edge's second endpoint.
    pub target: NodeId,
    /// The edge's weight, if it has one.
    #[serde(default, with = "weight_repr", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Edge {
    /// The endpoint opposite to `node`, or `None` if `node` is not an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    fn joins(&self, directed: bool, u: NodeId, v: NodeId) -> bool {
        (self.source == u && self.target == v)
            || (!directed && self.source == v && self.target == u)
    }
}

/// A mutable, possibly directed, possibly multi- graph.
///
/// Every edge endpoint is always a member of the node set: adding an edge
/// adds its endpoints, and removing a node removes its incident edges. Simple
/// (non-multi) graphs hold at most one edge per endpoint pair, and adding an
/// edge that already exists only updates its weight.
///
/// # Example
///
/// ```
/// use graphfuzz::Graph;
///
/// let mut g = Graph::new(false, false);
/// g.add_edge(0, 1, Some(2.0));
/// g.add_edge(1, 0, Some(5.0));
///
/// // Undirected and simple: the second call updated the first edge.
/// assert_eq!(g.edge_count(), 1);
/// assert_eq!(g.edges()[0].weight, Some(5.0));
/// assert_eq!(g.degree(0), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr", into = "GraphRepr")]
pub struct Graph {
    directed: bool,
    multigraph: bool,
    nodes: BTreeSet<NodeId>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Create an empty graph of the given kind.
    pub fn new(directed: bool, multigraph: bool) -> Self {
        Self {
            directed,
            multigraph,
            nodes: BTreeSet::new(),
            edges: Vec::new(),
        }
    }

    /// Create an empty graph with the same kind as `self`.
    pub fn empty_like(&self) -> Self {
        Self::new(self.directed, self.multigraph)
    }

    /// Whether edges are directed.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether parallel edges are allowed.
    pub fn is_multigraph(&self) -> bool {
        self.multigraph
    }

    /// Whether `self` and `other` are the same kind of graph, both in
    /// directedness and in simple-vs-multi.
    pub fn same_kind(&self, other: &Graph) -> bool {
        self.directed == other.directed && self.multigraph == other.multigraph
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate the nodes in ascending id order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// The edges, in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether `node` is in the graph.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// The id one past the largest id in use, or `0` for an empty graph.
    pub fn next_node_id(&self) -> NodeId {
        self.nodes.last().map_or(0, |n| n.saturating_add(1))
    }

    /// Add a node. Returns `false` if it was already present.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    /// Remove a node and every edge incident to it. Returns `false` if it was
    /// not present.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if !self.nodes.remove(&node) {
            return false;
        }
        self.edges.retain(|e| e.source != node && e.target != node);
        true
    }

    /// Remove every node in `nodes` along with their incident edges.
    pub fn remove_nodes(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        let doomed: BTreeSet<NodeId> = nodes.into_iter().collect();
        if doomed.is_empty() {
            return;
        }
        self.nodes.retain(|n| !doomed.contains(n));
        self.edges.retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
    }

    /// Add an edge, adding its endpoints if they are missing.
    ///
    /// On a simple graph an existing edge between the same endpoints has its
    /// weight replaced instead.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, weight: Option<f64>) {
        self.nodes.insert(source);
        self.nodes.insert(target);
        if !self.multigraph {
            if let Some(i) = self.find_edge(source, target) {
                self.edges[i].weight = weight;
                return;
            }
        }
        self.edges.push(Edge {
            source,
            target,
            weight,
        });
    }

    /// Index of the first edge joining `u` to `v`, honoring directedness.
    pub fn find_edge(&self, u: NodeId, v: NodeId) -> Option<usize> {
        self.edges.iter().position(|e| e.joins(self.directed, u, v))
    }

    /// Remove and return the edge at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_edge_at(&mut self, index: usize) -> Edge {
        self.edges.remove(index)
    }

    /// Replace the weight of the edge at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_weight(&mut self, index: usize, weight: Option<f64>) {
        self.edges[index].weight = weight;
    }

    /// Apply `f` to every edge weight.
    pub fn map_weights(&mut self, mut f: impl FnMut(Option<f64>) -> Option<f64>) {
        for e in &mut self.edges {
            e.weight = f(e.weight);
        }
    }

    /// The degree of `node`. A self loop contributes two.
    pub fn degree(&self, node: NodeId) -> usize {
        self.edges
            .iter()
            .map(|e| usize::from(e.source == node) + usize::from(e.target == node))
            .sum()
    }

    /// The degree of every node.
    pub fn degrees(&self) -> BTreeMap<NodeId, usize> {
        let mut degrees: BTreeMap<NodeId, usize> = self.nodes.iter().map(|&n| (n, 0)).collect();
        for e in &self.edges {
            *degrees.entry(e.source).or_default() += 1;
            *degrees.entry(e.target).or_default() += 1;
        }
        degrees
    }

    /// Nodes sorted by descending degree, ties in ascending id order.
    pub fn nodes_by_degree(&self) -> Vec<NodeId> {
        let degrees = self.degrees();
        let mut nodes: Vec<NodeId> = self.nodes.iter().copied().collect();
        nodes.sort_by(|a, b| degrees[b].cmp(&degrees[a]));
        nodes
    }

    /// Outgoing adjacency lists `node -> [(neighbor, weight)]`.
    ///
    /// Undirected edges appear in both endpoints' lists (a self loop once).
    /// Every node has an entry, possibly empty.
    pub fn adjacency(&self) -> BTreeMap<NodeId, Vec<(NodeId, Option<f64>)>> {
        let mut adj: BTreeMap<NodeId, Vec<(NodeId, Option<f64>)>> =
            self.nodes.iter().map(|&n| (n, Vec::new())).collect();
        for e in &self.edges {
            adj.entry(e.source).or_default().push((e.target, e.weight));
            if !self.directed && e.source != e.target {
                adj.entry(e.target).or_default().push((e.source, e.weight));
            }
        }
        adj
    }

    /// Incoming adjacency lists. Same as [`adjacency`][Self::adjacency] for
    /// undirected graphs.
    pub fn reverse_adjacency(&self) -> BTreeMap<NodeId, Vec<(NodeId, Option<f64>)>> {
        if !self.directed {
            return self.adjacency();
        }
        let mut adj: BTreeMap<NodeId, Vec<(NodeId, Option<f64>)>> =
            self.nodes.iter().map(|&n| (n, Vec::new())).collect();
        for e in &self.edges {
            adj.entry(e.target).or_default().push((e.source, e.weight));
        }
        adj
    }

    /// Whether every edge has a weight. Vacuously true without edges.
    pub fn is_weighted(&self) -> bool {
        self.edges.iter().all(|e| e.weight.is_some())
    }

    /// Whether any edge has a negative weight. `NaN` is not negative.
    pub fn has_negative_weight(&self) -> bool {
        self.edges
            .iter()
            .any(|e| matches!(e.weight, Some(w) if w < 0.0))
    }

    /// Whether any edge weight is `NaN`.
    pub fn has_nan_weight(&self) -> bool {
        self.edges
            .iter()
            .any(|e| matches!(e.weight, Some(w) if w.is_nan()))
    }

    /// Sum of edge weights, counting a missing weight as `1`.
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight.unwrap_or(1.0)).sum()
    }

    /// Rename nodes through `map`. Nodes missing from `map` keep their id.
    ///
    /// The caller must ensure the mapping is injective on this graph's nodes.
    pub fn relabel(&self, map: &BTreeMap<NodeId, NodeId>) -> Graph {
        let rename = |n: NodeId| map.get(&n).copied().unwrap_or(n);
        Graph {
            directed: self.directed,
            multigraph: self.multigraph,
            nodes: self.nodes.iter().map(|&n| rename(n)).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| Edge {
                    source: rename(e.source),
                    target: rename(e.target),
                    weight: e.weight,
                })
                .collect(),
        }
    }

    /// Relabel nodes to the consecutive range `offset..offset + n`, in
    /// ascending id order. Returns the new graph and the mapping used.
    pub fn relabel_consecutive(&self, offset: NodeId) -> (Graph, BTreeMap<NodeId, NodeId>) {
        let map: BTreeMap<NodeId, NodeId> = self
            .nodes
            .iter()
            .zip(offset..)
            .map(|(&old, new)| (old, new))
            .collect();
        (self.relabel(&map), map)
    }

    /// The disjoint union of two graphs of the same kind.
    ///
    /// `self` is relabeled to `0..n` and `other` to `n..n + m`, both in
    /// ascending id order. The relabeling maps are returned alongside.
    pub fn disjoint_union(
        &self,
        other: &Graph,
    ) -> Result<(Graph, BTreeMap<NodeId, NodeId>, BTreeMap<NodeId, NodeId>)> {
        if !self.same_kind(other) {
            return Err(Error::other(
                "cannot take the disjoint union of graphs of different kinds",
            ));
        }
        let offset = NodeId::try_from(self.node_count())
            .map_err(|_| Error::other("graph has too many nodes to relabel"))?;
        let (mut left, left_map) = self.relabel_consecutive(0);
        let (right, right_map) = other.relabel_consecutive(offset);
        left.nodes.extend(right.nodes);
        left.edges.extend(right.edges);
        Ok((left, left_map, right_map))
    }

    /// The same graph with every edge direction flipped.
    pub fn reversed(&self) -> Graph {
        let mut g = self.clone();
        for e in &mut g.edges {
            std::mem::swap(&mut e.source, &mut e.target);
        }
        g
    }

    /// Check the structural invariants: every edge endpoint is a node, and a
    /// simple graph has no parallel edges.
    pub fn validate(&self) -> Result<()> {
        for e in &self.edges {
            if !self.nodes.contains(&e.source) || !self.nodes.contains(&e.target) {
                return Err(Error::other(format!(
                    "edge ({}, {}) has an endpoint outside the node set",
                    e.source, e.target
                )));
            }
        }
        if !self.multigraph {
            let mut seen = BTreeSet::new();
            for e in &self.edges {
                let key = if self.directed || e.source <= e.target {
                    (e.source, e.target)
                } else {
                    (e.target, e.source)
                };
                if !seen.insert(key) {
                    return Err(Error::other(format!(
                        "simple graph has parallel edges between {} and {}",
                        key.0, key.1
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.directed, self.multigraph) {
            (false, false) => "Graph",
            (true, false) => "DiGraph",
            (false, true) => "MultiGraph",
            (true, true) => "MultiDiGraph",
        };
        write!(
            f,
            "{kind} with {} nodes and {} edges",
            self.node_count(),
            self.edge_count()
        )
    }
}

#[derive(Serialize, Deserialize)]
struct GraphRepr {
    directed: bool,
    #[serde(default)]
    multigraph: bool,
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
}

impl TryFrom<GraphRepr> for Graph {
    type Error = Error;

    fn try_from(repr: GraphRepr) -> Result<Self> {
        let graph = Graph {
            directed: repr.directed,
            multigraph: repr.multigraph,
            nodes: repr.nodes.into_iter().collect(),
            edges: repr.edges,
        };
        graph.validate()?;
        Ok(graph)
    }
}

impl From<Graph> for GraphRepr {
    fn from(g: Graph) -> Self {
        GraphRepr {
            directed: g.directed,
            multigraph: g.multigraph,
            nodes: g.nodes.into_iter().collect(),
            edges: g.edges,
        }
    }
}

/// JSON has no encoding for non-finite numbers, so they travel as strings.
pub(crate) mod weight_repr {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(weight: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match weight {
            None => s.serialize_none(),
            Some(w) if w.is_finite() => s.serialize_some(&Repr::Number(*w)),
            Some(w) => s.serialize_some(&Repr::Text(super::format_non_finite(*w).into())),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Number(w)) => Ok(Some(w)),
            Some(Repr::Text(t)) => super::parse_non_finite(&t)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid weight `{t}`"))),
        }
    }
}

pub(crate) fn format_non_finite(w: f64) -> &'static str {
    if w.is_nan() {
        "NaN"
    } else if w > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

pub(crate) fn parse_non_finite(t: &str) -> Option<f64> {
    match t {
        "NaN" | "nan" => Some(f64::NAN),
        "inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}
