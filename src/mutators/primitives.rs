use crate::{Graph, Rng};

pub(crate) const MIN_NEGATIVE_WEIGHT: i64 = -200;
pub(crate) const MAX_WEIGHT: i64 = 200;
pub(crate) const MIN_POSITIVE_WEIGHT: i64 = 0;
pub(crate) const MAX_POSITIVE_WEIGHT: i64 = 100;

/// Probability that a reweighted edge gets `NaN` instead of a number.
pub(crate) const NAN_PROBABILITY: f64 = 0.005;

/// Draw a fresh edge weight for a graph whose weights are (or are not)
/// already allowed to be negative.
pub(crate) fn draw_weight(rng: &mut Rng, negative: bool) -> f64 {
    let range = if negative {
        MIN_NEGATIVE_WEIGHT..=MAX_WEIGHT
    } else {
        MIN_POSITIVE_WEIGHT..=MAX_POSITIVE_WEIGHT
    };
    rng.gen_range_i64(range) as f64
}

/// Add the node one past the largest id in use.
pub fn add_node(graph: &mut Graph) {
    let id = graph.next_node_id();
    graph.add_node(id);
}

/// Remove a random node and its incident edges. No-op on an empty graph.
pub fn delete_node(graph: &mut Graph, rng: &mut Rng) {
    if let Some(node) = rng.choose(graph.nodes()) {
        graph.remove_node(node);
    }
}

/// Add an edge between two random (possibly equal) nodes.
///
/// The edge carries a weight exactly when every existing edge does.
pub fn add_edge(graph: &mut Graph, rng: &mut Rng) {
    let (Some(u), Some(v)) = (rng.choose(graph.nodes()), rng.choose(graph.nodes())) else {
        return;
    };
    let weight = graph
        .is_weighted()
        .then(|| draw_weight(rng, graph.has_negative_weight()));
    graph.add_edge(u, v, weight);
}

/// Remove a random edge. No-op on an edgeless graph.
pub fn delete_edge(graph: &mut Graph, rng: &mut Rng) {
    if let Some(i) = rng.gen_index(graph.edge_count()) {
        graph.remove_edge_at(i);
    }
}

/// Assign a new weight to a random edge.
///
/// Only applies when every edge is weighted. The new weight comes from
/// `[-200, 200]` when some weight is already negative and `[0, 200]`
/// otherwise, and is `NaN` with a small probability.
pub fn reweight_edge(graph: &mut Graph, rng: &mut Rng) {
    if !graph.is_weighted() {
        return;
    }
    let Some(i) = rng.gen_index(graph.edge_count()) else {
        return;
    };
    let weight = if rng.gen_bool(NAN_PROBABILITY) {
        f64::NAN
    } else if graph.has_negative_weight() {
        rng.gen_range_i64(MIN_NEGATIVE_WEIGHT..=MAX_WEIGHT) as f64
    } else {
        rng.gen_range_i64(MIN_POSITIVE_WEIGHT..=MAX_WEIGHT) as f64
    };
    graph.set_weight(i, Some(weight));
}

/// Remove between a fifth and two fifths of the nodes, lowest degree first.
///
/// Graphs with two nodes or fewer are left alone.
pub fn trim(graph: &mut Graph, rng: &mut Rng) {
    let n = graph.node_count();
    if n <= 2 {
        return;
    }
    let k = rng.gen_range_usize(n / 5..=2 * n / 5);
    remove_lowest_degree(graph, k);
}

/// Like [`trim`] but always removes at least one node from graphs with more
/// than two nodes.
pub(crate) fn trim_with_progress(graph: &mut Graph, rng: &mut Rng) {
    let n = graph.node_count();
    if n <= 2 {
        return;
    }
    let k = rng.gen_range_usize(n / 5..=2 * n / 5).max(1);
    remove_lowest_degree(graph, k);
}

fn remove_lowest_degree(graph: &mut Graph, k: usize) {
    let by_degree = graph.nodes_by_degree();
    let keep = by_degree.len().saturating_sub(k);
    graph.remove_nodes(by_degree[keep..].iter().copied());
}
