//! Adamic-Adar index of every non-adjacent node pair of an undirected
//! graph: the sum of `1 / ln(degree(w))` over common neighbors `w`.

use super::{require_undirected, Target};
use crate::feedback::Signal;
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::RelabelNodes;
use crate::oracle::Implementation;
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::collections::{BTreeMap, BTreeSet};

const WHAT: &str = "adamic adar index";
const TOLERANCE: f64 = 1e-3;

pub(super) fn target() -> Target {
    Target::new(
        "adamic_adar",
        false,
        Signal::new(neighbor_intersection, DefaultReducer),
    )
    .weights(Weights::Unweighted)
    .implementation(Implementation::new("neighbor_intersection", neighbor_intersection))
    .implementation(Implementation::new("two_hop", two_hop))
    .tolerance(TOLERANCE)
    .metamorphism(RelabelNodes {
        tolerance: TOLERANCE,
    })
}

fn neighborhoods(graph: &Graph) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    graph
        .adjacency()
        .into_iter()
        .map(|(n, adj)| (n, adj.into_iter().map(|(m, _)| m).collect()))
        .collect()
}

/// Distinct node pairs `u < v` that are not adjacent.
fn non_edges(neighbors: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> Vec<(NodeId, NodeId)> {
    let nodes: Vec<NodeId> = neighbors.keys().copied().collect();
    let mut pairs = Vec::new();
    for (i, &u) in nodes.iter().enumerate() {
        for &v in &nodes[i + 1..] {
            if !neighbors[&u].contains(&v) {
                pairs.push((u, v));
            }
        }
    }
    pairs
}

fn contribution(graph: &Graph, w: NodeId) -> f64 {
    1.0 / (graph.degree(w) as f64).ln()
}

fn neighbor_intersection(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let neighbors = neighborhoods(graph);
    let pairs = non_edges(&neighbors)
        .into_iter()
        .map(|(u, v)| {
            let score: f64 = neighbors[&u]
                .intersection(&neighbors[&v])
                .filter(|&&w| w != u && w != v)
                .map(|&w| contribution(graph, w))
                .sum();
            (u, v, score)
        })
        .collect();
    Ok(Output::ScoredPairs(pairs))
}

/// Walk every two-hop path `u - w - v` once from its middle node.
fn two_hop(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let neighbors = neighborhoods(graph);
    let mut scores: BTreeMap<(NodeId, NodeId), f64> = non_edges(&neighbors)
        .into_iter()
        .map(|pair| (pair, 0.0))
        .collect();

    for (&w, around) in &neighbors {
        let around: Vec<NodeId> = around.iter().copied().filter(|&n| n != w).collect();
        if around.len() < 2 {
            continue;
        }
        probe!();
        let c = contribution(graph, w);
        for (i, &u) in around.iter().enumerate() {
            for &v in &around[i + 1..] {
                if let Some(score) = scores.get_mut(&(u, v)) {
                    *score += c;
                }
            }
        }
    }
    Ok(Output::ScoredPairs(
        scores.into_iter().map(|((u, v), s)| (u, v, s)).collect(),
    ))
}
