use super::primitives::{draw_weight, trim_with_progress};
use crate::{Graph, NodeId, Rng};

/// Combined graphs are trimmed until both operands together have at most this
/// many nodes.
pub const MAX_NODES: usize = 300;

/// How many highest-degree node pairs are bridged across the two halves.
const BRIDGED_PAIRS: usize = 3;

/// Replace `graph` with its disjoint union with `other`, bridged by a few
/// cross edges.
///
/// Returns `false`, leaving `graph` untouched, when the two graphs are of
/// different kinds (directed vs undirected, simple vs multi).
///
/// # Example
///
/// ```
/// use graphfuzz::{mutators::combine, Graph, Rng};
///
/// let mut left = Graph::new(false, false);
/// left.add_edge(0, 1, None);
/// let mut right = Graph::new(false, false);
/// right.add_edge(5, 6, None);
///
/// assert!(combine(&mut left, right, &mut Rng::new(1)));
/// assert_eq!(left.node_count(), 4);
/// assert!(left.edge_count() >= 3);
///
/// // Refused: the operands differ in directedness.
/// assert!(!combine(&mut left, Graph::new(true, false), &mut Rng::new(1)));
/// ```
pub fn combine(graph: &mut Graph, mut other: Graph, rng: &mut Rng) -> bool {
    if !graph.same_kind(&other) {
        log::debug!("refusing to combine {graph} with {other}");
        return false;
    }

    if graph.is_empty() {
        graph.add_node(0);
    }
    if other.is_empty() {
        other.add_node(0);
    }

    while graph.node_count() + other.node_count() > MAX_NODES {
        trim_with_progress(graph, rng);
        trim_with_progress(&mut other, rng);
    }

    let weighted = graph.is_weighted() || other.is_weighted();
    let negative = weighted && (graph.has_negative_weight() || other.has_negative_weight());
    let weight = |rng: &mut Rng| weighted.then(|| draw_weight(rng, negative));

    let left_degrees = graph.degrees();
    let right_degrees = other.degrees();
    let left_order = graph.nodes_by_degree();
    let right_order = other.nodes_by_degree();
    let left_nodes: Vec<NodeId> = graph.nodes().collect();
    let right_nodes: Vec<NodeId> = other.nodes().collect();

    let (mut union, left_map, right_map) = match graph.disjoint_union(&other) {
        Ok(parts) => parts,
        Err(e) => {
            log::debug!("not combining: {e}");
            return false;
        }
    };

    for (a, b) in left_order.iter().zip(&right_order).take(BRIDGED_PAIRS) {
        if left_degrees[a] > 0 && right_degrees[b] > 0 {
            let w = weight(rng);
            union.add_edge(left_map[a], right_map[b], w);
        }
    }

    let extra = rng.gen_range_usize(1..=5);
    for _ in 0..extra {
        let (Some(a), Some(b)) = (rng.choose(left_nodes.iter()), rng.choose(right_nodes.iter()))
        else {
            continue;
        };
        let w = weight(rng);
        union.add_edge(left_map[a], right_map[b], w);
    }

    *graph = union;
    true
}
