//! Jaccard similarity of every non-adjacent node pair of an undirected
//! graph: shared neighbors over the union of both neighborhoods, `0` when
//! both are empty. Self loops do not count as neighbors.

use super::{require_undirected, Target};
use crate::executor::Outcome;
use crate::feedback::Signal;
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::RelabelNodes;
use crate::oracle::{Checker, Implementation, Metamorphism, Transformed};
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output, Rng};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Unbounded};

const WHAT: &str = "jaccard similarity";
const TOLERANCE: f64 = 1e-6;

pub(super) fn target() -> Target {
    Target::new("jaccard", false, Signal::new(set_based, DefaultReducer))
        .weights(Weights::Unweighted)
        .implementation(Implementation::new("set_based", set_based))
        .implementation(Implementation::new("common_neighbor_count", common_neighbor_count))
        .tolerance(TOLERANCE)
        .metamorphism(RelabelNodes {
            tolerance: TOLERANCE,
        })
        .metamorphism(IsolatedPairs)
}

fn neighborhoods(graph: &Graph) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    graph
        .adjacency()
        .into_iter()
        .map(|(n, adj)| (n, adj.into_iter().map(|(m, _)| m).filter(|&m| m != n).collect()))
        .collect()
}

fn set_based(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let neighbors = neighborhoods(graph);
    let nodes: Vec<NodeId> = neighbors.keys().copied().collect();
    let mut pairs = Vec::new();
    for (i, &u) in nodes.iter().enumerate() {
        for &v in &nodes[i + 1..] {
            if neighbors[&u].contains(&v) {
                continue;
            }
            let union = neighbors[&u].union(&neighbors[&v]).count();
            let score = if union == 0 {
                probe!();
                0.0
            } else {
                neighbors[&u].intersection(&neighbors[&v]).count() as f64 / union as f64
            };
            pairs.push((u, v, score));
        }
    }
    Ok(Output::ScoredPairs(pairs))
}

/// Count shared neighbors by walking two-hop paths, then get the union size
/// from the degrees.
fn common_neighbor_count(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let neighbors = neighborhoods(graph);
    let mut common: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
    for around in neighbors.values() {
        let around: Vec<NodeId> = around.iter().copied().collect();
        for (i, &u) in around.iter().enumerate() {
            for &v in &around[i + 1..] {
                *common.entry((u, v)).or_default() += 1;
            }
        }
    }

    let degree = |n: &NodeId| neighbors[n].len();
    let mut pairs = Vec::new();
    for (u, around) in &neighbors {
        for v in neighbors.range((Excluded(*u), Unbounded)).map(|(v, _)| v) {
            if around.contains(v) {
                continue;
            }
            let shared = common.get(&(*u, *v)).copied().unwrap_or(0);
            let union = degree(u) + degree(v) - shared;
            if union == 0 {
                probe!();
                pairs.push((*u, *v, 0.0));
            } else {
                pairs.push((*u, *v, shared as f64 / union as f64));
            }
        }
    }
    Ok(Output::ScoredPairs(pairs))
}

/// Add a node with no edges. It scores `0` against every other node, and
/// every other score is unchanged.
#[derive(Clone, Copy, Debug)]
struct IsolatedPairs;

impl Metamorphism for IsolatedPairs {
    fn name(&self) -> &str {
        "isolated_pair_insertion"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        _rng: &mut Rng,
    ) -> Option<Transformed> {
        let Output::ScoredPairs(pairs) = result else {
            return None;
        };
        let fresh = graph.next_node_id();
        if graph.contains_node(fresh) {
            return None;
        }
        let mut expected = pairs.clone();
        expected.extend(graph.nodes().map(|n| (n, fresh, 0.0)));
        let expected = Output::ScoredPairs(expected);

        let mut grown = graph.clone();
        grown.add_node(fresh);
        let checker: Checker = Box::new(move |outcome: &Outcome| {
            matches!(outcome, Outcome::Ok(out) if out.approx_eq(&expected, TOLERANCE))
        });
        Some(Transformed {
            graph: grown,
            args: args.to_vec(),
            checker,
        })
    }
}
