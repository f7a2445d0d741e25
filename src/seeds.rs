//! Initial corpus generation.
//!
//! A run starts either from a single one-node graph of the target's kind, or
//! from a handful of random preferential-attachment graphs. A corpus
//! snapshot saved by an earlier run can stand in for both.

use crate::persist;
use crate::targets::Target;
use crate::{Graph, NodeId, Rng};
use std::path::Path;

/// Nodes in each random seed graph.
pub const RANDOM_NODES: usize = 30;

/// Edges each new node attaches with in a random seed graph.
pub const RANDOM_ATTACHMENTS: usize = 2;

/// Random seed graphs generated per run.
pub const RANDOM_GRAPHS: usize = 10;

/// The weights carried by random seed graphs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Weights {
    /// No weights.
    Unweighted,
    /// Integers in `[0, 100]`.
    #[default]
    NonNegative,
    /// Integers in `[1, 100]`.
    Positive,
    /// Integers in `[-200, 200]`.
    Signed,
}

impl Weights {
    /// Draw one weight.
    pub fn draw(self, rng: &mut Rng) -> Option<f64> {
        let range = match self {
            Weights::Unweighted => return None,
            Weights::NonNegative => 0..=100,
            Weights::Positive => 1..=100,
            Weights::Signed => -200..=200,
        };
        Some(rng.gen_range_i64(range) as f64)
    }
}

/// A one-node graph of the kind `target` takes.
pub fn single_node(target: &Target) -> Graph {
    let mut graph = target.empty_graph();
    graph.add_node(0);
    graph
}

/// A random graph of the kind `target` takes, grown by preferential
/// attachment: each of `nodes` nodes after the first `attachments` links to
/// `attachments` distinct earlier nodes chosen with probability proportional
/// to their degree.
///
/// ```
/// use graphfuzz::{seeds, targets, Rng};
///
/// let target = targets::by_name("components").unwrap();
/// let g = seeds::random_graph(&target, 30, 2, &mut Rng::new(7));
/// assert_eq!(g.node_count(), 30);
/// assert_eq!(g.edge_count(), 2 * 28);
/// ```
pub fn random_graph(target: &Target, nodes: usize, attachments: usize, rng: &mut Rng) -> Graph {
    let mut graph = target.empty_graph();
    let weights = target.seed_weights();
    let attachments = attachments.max(1);
    let nodes = nodes.min(NodeId::MAX as usize);
    // Each node appears once per incident edge, so a uniform draw from this
    // list is a degree-proportional draw.
    let mut endpoints: Vec<NodeId> = Vec::new();
    let mut initial: Vec<NodeId> = Vec::new();

    for index in 0..nodes {
        let node = index as NodeId;
        graph.add_node(node);
        if index < attachments {
            initial.push(node);
            continue;
        }
        let mut targets: Vec<NodeId> = Vec::with_capacity(attachments);
        while targets.len() < attachments {
            let pool = if endpoints.is_empty() { &initial } else { &endpoints };
            let Some(&candidate) = rng.choose(pool.iter()) else {
                break;
            };
            if !targets.contains(&candidate) {
                targets.push(candidate);
            } else if pool.iter().all(|n| targets.contains(n)) {
                break;
            }
        }
        for t in targets {
            graph.add_edge(node, t, weights.draw(rng));
            endpoints.push(node);
            endpoints.push(t);
        }
    }
    graph
}

/// [`RANDOM_GRAPHS`] random seed graphs for `target`.
pub fn random_graphs(target: &Target, rng: &mut Rng) -> Vec<Graph> {
    (0..RANDOM_GRAPHS)
        .map(|_| random_graph(target, RANDOM_NODES, RANDOM_ATTACHMENTS, rng))
        .collect()
}

/// The initial corpus of a run.
///
/// Graphs from the snapshot at `corpus` are used when it holds any of the
/// target's kind; otherwise seeds are generated, several random graphs when
/// `multiple` is set and a single one-node graph if not.
pub fn initial(
    target: &Target,
    corpus: Option<&Path>,
    multiple: bool,
    rng: &mut Rng,
) -> Vec<Graph> {
    if let Some(path) = corpus {
        let loaded = persist::load_corpus(path);
        let total = loaded.len();
        let kind = target.empty_graph();
        let usable: Vec<Graph> = loaded
            .into_iter()
            .filter(|g| g.same_kind(&kind))
            .collect();
        if usable.len() < total {
            log::warn!(
                "ignoring {} graphs of the wrong kind for target `{}`",
                total - usable.len(),
                target.name()
            );
        }
        if !usable.is_empty() {
            return usable;
        }
    }
    if multiple {
        random_graphs(target, rng)
    } else {
        vec![single_node(target)]
    }
}
