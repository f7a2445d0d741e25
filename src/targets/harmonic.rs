//! Harmonic centrality: for each node, the sum of reciprocal shortest path
//! lengths from every other node to it.

use super::shortest_path::dijkstra_distances;
use super::{weight_or_one, Indexed, Target};
use crate::feedback::Signal;
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::{AddIsolatedNode, RelabelNodes, ScaleWeights};
use crate::oracle::Implementation;
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::collections::BTreeMap;

const TOLERANCE: f64 = 1e-6;

pub(super) fn target() -> Target {
    Target::new(
        "harmonic",
        true,
        Signal::new(dijkstra_based, DefaultReducer),
    )
    .weights(Weights::Positive)
    .implementation(Implementation::new("dijkstra", dijkstra_based))
    .implementation(Implementation::new("floyd_warshall", floyd_warshall))
    .tolerance(TOLERANCE)
    .precondition(positive_weights)
    .metamorphism(ScaleWeights::inverse(TOLERANCE))
    .metamorphism(RelabelNodes {
        tolerance: TOLERANCE,
    })
    .metamorphism(AddIsolatedNode)
}

/// Distances are only meaningful with strictly positive weights.
fn positive_weights(graph: &Graph) -> bool {
    graph
        .edges()
        .iter()
        .all(|e| e.weight.map_or(true, |w| w > 0.0))
}

fn reciprocal(d: f64) -> f64 {
    if d > 0.0 && d.is_finite() {
        1.0 / d
    } else {
        0.0
    }
}

fn dijkstra_based(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    // Distances to `u` are distances from `u` against the edge direction.
    let incoming = Indexed::reversed(graph);
    let scores: BTreeMap<NodeId, f64> = (0..incoming.len())
        .map(|u| {
            let score: f64 = dijkstra_distances(&incoming, u)
                .into_iter()
                .enumerate()
                .filter(|&(v, _)| v != u)
                .map(|(_, d)| reciprocal(d))
                .sum();
            (incoming.ids[u], score)
        })
        .collect();
    Ok(Output::Scores(scores))
}

fn floyd_warshall(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let n = g.len();
    let mut dist = vec![vec![f64::INFINITY; n]; n];
    for (u, row) in dist.iter_mut().enumerate() {
        row[u] = 0.0;
        for &(v, w) in &g.out[u] {
            if u != v {
                row[v] = row[v].min(weight_or_one(w));
            }
        }
    }
    for k in 0..n {
        for i in 0..n {
            let dik = dist[i][k];
            if dik == f64::INFINITY {
                continue;
            }
            for j in 0..n {
                let through = dik + dist[k][j];
                if through < dist[i][j] {
                    probe!();
                    dist[i][j] = through;
                }
            }
        }
    }

    let scores = (0..n)
        .map(|u| {
            let score: f64 = (0..n)
                .filter(|&v| v != u)
                .map(|v| reciprocal(dist[v][u]))
                .sum();
            (g.ids[u], score)
        })
        .collect();
    Ok(Output::Scores(scores))
}
