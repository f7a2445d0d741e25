//! Single-pair shortest path lengths.
//!
//! A missing weight counts as `1`. An unreachable target and a negative cycle
//! reachable from the source are both failures, which the differential
//! oracle compares as an infinite length.

use super::{top_two, weight_or_one, Cost, Indexed, Target};
use crate::feedback::{FeedbackKind, Signal};
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::{
    AddIsolatedNode, LongerDetour, RelabelNodes, ReverseEdges, ScaleWeights,
};
use crate::oracle::{Arguments, Implementation};
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

const TOLERANCE: f64 = 1e-6;

pub(super) fn target() -> Target {
    Target::new(
        "shortest_path",
        true,
        Signal::new(bellman_ford, DefaultReducer).with_args(top_two),
    )
    .weights(Weights::Signed)
    .implementation(Implementation::new("bellman_ford", bellman_ford))
    .implementation(Implementation::new("spfa", spfa))
    .implementation(Implementation::new("dijkstra", dijkstra).guarded(no_negative_weights))
    .arguments(Arguments::NodePairs { rounds: 5 })
    .tolerance(TOLERANCE)
    .sentinel(Output::Number(f64::INFINITY))
    .specialization(
        FeedbackKind::HopCount,
        Signal::new(hop_count, DefaultReducer).with_args(top_two),
    )
    .specialization(
        FeedbackKind::NegativeEdges,
        Signal::new(negative_edges, DefaultReducer).with_args(top_two),
    )
    .metamorphism(ScaleWeights::proportional(TOLERANCE))
    .metamorphism(ReverseEdges {
        tolerance: TOLERANCE,
    })
    .metamorphism(RelabelNodes {
        tolerance: TOLERANCE,
    })
    .metamorphism(AddIsolatedNode)
    .metamorphism(LongerDetour {
        tolerance: TOLERANCE,
    })
}

fn no_negative_weights(graph: &Graph) -> bool {
    !graph.has_negative_weight()
}

fn negative_cycle() -> ExecError {
    ExecError::algorithm("Negative cycle detected.")
}

/// Distances from one source, with the edge each node was last reached by.
struct Paths {
    dist: Vec<f64>,
    pred: Vec<Option<(usize, f64)>>,
}

impl Paths {
    fn new(n: usize, source: usize) -> Self {
        let mut dist = vec![f64::INFINITY; n];
        dist[source] = 0.0;
        Self {
            dist,
            pred: vec![None; n],
        }
    }

    fn length(&self, g: &Indexed, source: usize, target: usize) -> Result<Output, ExecError> {
        let d = self.dist[target];
        if d == f64::INFINITY {
            probe!();
            return Err(ExecError::algorithm(format!(
                "Node {} not reachable from {}",
                g.ids[target], g.ids[source]
            )));
        }
        Ok(Output::Number(d))
    }

    /// Weights of the edges on the path to `target`, or `None` if there is
    /// no path.
    fn path_weights(&self, source: usize, target: usize) -> Option<Vec<f64>> {
        if self.dist[target] == f64::INFINITY {
            return None;
        }
        let mut weights = Vec::new();
        let mut v = target;
        while v != source {
            let (u, w) = self.pred[v]?;
            weights.push(w);
            v = u;
            if weights.len() > self.dist.len() {
                return None;
            }
        }
        Some(weights)
    }
}

fn bellman_ford_from(g: &Indexed, source: usize) -> Result<Paths, ExecError> {
    let n = g.len();
    let mut paths = Paths::new(n, source);
    for round in 0..n {
        let mut changed = false;
        for u in 0..n {
            let du = paths.dist[u];
            if du == f64::INFINITY {
                continue;
            }
            for &(v, w) in &g.out[u] {
                let w = weight_or_one(w);
                if du + w < paths.dist[v] {
                    if round + 1 == n {
                        probe!();
                        return Err(negative_cycle());
                    }
                    paths.dist[v] = du + w;
                    paths.pred[v] = Some((u, w));
                    changed = true;
                }
            }
        }
        if !changed {
            probe!();
            break;
        }
    }
    Ok(paths)
}

fn bellman_ford(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let (source, target) = g.endpoints(args)?;
    bellman_ford_from(&g, source)?.length(&g, source, target)
}

fn spfa(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let (source, target) = g.endpoints(args)?;
    let n = g.len();
    let mut paths = Paths::new(n, source);
    // Edges on the current best path to each node.
    let mut hops = vec![0; n];
    let mut queued = vec![false; n];
    let mut queue = VecDeque::from([source]);
    queued[source] = true;

    while let Some(u) = queue.pop_front() {
        queued[u] = false;
        let du = paths.dist[u];
        for &(v, w) in &g.out[u] {
            let w = weight_or_one(w);
            if du + w < paths.dist[v] {
                paths.dist[v] = du + w;
                paths.pred[v] = Some((u, w));
                hops[v] = hops[u] + 1;
                if hops[v] >= n {
                    probe!();
                    return Err(negative_cycle());
                }
                if !queued[v] {
                    queued[v] = true;
                    queue.push_back(v);
                }
            }
        }
    }
    paths.length(&g, source, target)
}

fn dijkstra(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let (source, target) = g.endpoints(args)?;
    dijkstra_from(&g, source).length(&g, source, target)
}

pub(super) fn dijkstra_distances(g: &Indexed, source: usize) -> Vec<f64> {
    dijkstra_from(g, source).dist
}

fn dijkstra_from(g: &Indexed, source: usize) -> Paths {
    let mut paths = Paths::new(g.len(), source);
    let mut heap = BinaryHeap::from([Reverse((Cost(0.0), source))]);
    while let Some(Reverse((Cost(d), u))) = heap.pop() {
        if d > paths.dist[u] {
            continue;
        }
        for &(v, w) in &g.out[u] {
            let w = weight_or_one(w);
            if d + w < paths.dist[v] {
                probe!();
                paths.dist[v] = d + w;
                paths.pred[v] = Some((u, w));
                heap.push(Reverse((Cost(d + w), v)));
            }
        }
    }
    paths
}

/// Edges on the Bellman-Ford path: infinite without a path, negative
/// infinity on a negative cycle.
fn hop_count(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let (source, target) = g.endpoints(args)?;
    let hops = match bellman_ford_from(&g, source) {
        Err(_) => f64::NEG_INFINITY,
        Ok(paths) => paths
            .path_weights(source, target)
            .map_or(f64::INFINITY, |p| p.len() as f64),
    };
    Ok(Output::Number(hops))
}

/// Negative edges on the Bellman-Ford path: `0` without a path, `-1` on a
/// negative cycle.
fn negative_edges(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let (source, target) = g.endpoints(args)?;
    let count = match bellman_ford_from(&g, source) {
        Err(_) => -1.0,
        Ok(paths) => paths
            .path_weights(source, target)
            .map_or(0, |p| p.iter().filter(|&&w| w < 0.0).count()) as f64,
    };
    Ok(Output::Number(count))
}
