//! Maximum flow values between node pairs.
//!
//! An edge's capacity is its weight; a missing weight is `1`, and negative
//! or `NaN` weights carry nothing. Parallel edges add up.

use super::{require_directed, top_two, Indexed, Target};
use crate::feedback::{FeedbackKind, Signal};
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::{AddIsolatedNode, RelabelNodes, ReverseEdges, ScaleWeights};
use crate::oracle::{Arguments, Implementation};
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::collections::VecDeque;

const WHAT: &str = "maximum flow";
const TOLERANCE: f64 = 1e-6;
const EPSILON: f64 = 1e-12;

pub(super) fn target() -> Target {
    Target::new(
        "max_flow",
        true,
        Signal::new(edmonds_karp, DefaultReducer).with_args(top_two),
    )
    .implementation(Implementation::new("edmonds_karp", edmonds_karp))
    .implementation(Implementation::new("dinic", dinic))
    .arguments(Arguments::NodePairs { rounds: 5 })
    .tolerance(TOLERANCE)
    .specialization(
        FeedbackKind::SaturatedEdges,
        Signal::new(saturated_edges, DefaultReducer).with_args(top_two),
    )
    .metamorphism(ScaleWeights::proportional(TOLERANCE))
    .metamorphism(ReverseEdges {
        tolerance: TOLERANCE,
    })
    .metamorphism(RelabelNodes {
        tolerance: TOLERANCE,
    })
    .metamorphism(AddIsolatedNode)
}

fn edge_capacity(weight: Option<f64>) -> f64 {
    match weight {
        None => 1.0,
        Some(w) if w.is_nan() || w < 0.0 => 0.0,
        Some(w) => w,
    }
}

/// A dense residual network.
struct Network {
    capacity: Vec<Vec<f64>>,
    flow: Vec<Vec<f64>>,
    neighbors: Vec<Vec<usize>>,
    source: usize,
    sink: usize,
}

impl Network {
    fn new(graph: &Graph, args: &[NodeId]) -> Result<Self, ExecError> {
        require_directed(graph, WHAT)?;
        let g = Indexed::new(graph);
        let (source, sink) = g.endpoints(args)?;
        if source == sink {
            return Err(ExecError::algorithm("source and sink are the same node"));
        }
        let n = g.len();
        let mut capacity = vec![vec![0.0; n]; n];
        for (u, out) in g.out.iter().enumerate() {
            for &(v, w) in out {
                if u != v {
                    capacity[u][v] += edge_capacity(w);
                }
            }
        }
        let neighbors = (0..n)
            .map(|u| {
                (0..n)
                    .filter(|&v| capacity[u][v] > 0.0 || capacity[v][u] > 0.0)
                    .collect()
            })
            .collect();
        Ok(Self {
            capacity,
            flow: vec![vec![0.0; n]; n],
            neighbors,
            source,
            sink,
        })
    }

    fn residual(&self, u: usize, v: usize) -> f64 {
        self.capacity[u][v] - self.flow[u][v]
    }

    fn push(&mut self, u: usize, v: usize, amount: f64) {
        self.flow[u][v] += amount;
        self.flow[v][u] -= amount;
    }

    fn value(&self) -> f64 {
        self.neighbors[self.source]
            .iter()
            .map(|&v| self.flow[self.source][v])
            .sum()
    }

    /// Shortest augmenting paths.
    fn edmonds_karp(&mut self) {
        let n = self.capacity.len();
        loop {
            let mut parent = vec![None; n];
            parent[self.source] = Some(self.source);
            let mut queue = VecDeque::from([self.source]);
            while let Some(u) = queue.pop_front() {
                for &v in &self.neighbors[u] {
                    if parent[v].is_none() && self.residual(u, v) > EPSILON {
                        parent[v] = Some(u);
                        queue.push_back(v);
                    }
                }
            }
            if parent[self.sink].is_none() {
                probe!();
                return;
            }

            let mut path = Vec::new();
            let mut v = self.sink;
            while v != self.source {
                let Some(u) = parent[v] else { return };
                path.push((u, v));
                v = u;
            }
            let bottleneck = path
                .iter()
                .map(|&(u, v)| self.residual(u, v))
                .fold(f64::INFINITY, f64::min);
            for (u, v) in path {
                self.push(u, v, bottleneck);
            }
            probe!();
        }
    }

    /// Blocking flows over level graphs.
    fn dinic(&mut self) {
        let n = self.capacity.len();
        loop {
            let mut level = vec![usize::MAX; n];
            level[self.source] = 0;
            let mut queue = VecDeque::from([self.source]);
            while let Some(u) = queue.pop_front() {
                for &v in &self.neighbors[u] {
                    if level[v] == usize::MAX && self.residual(u, v) > EPSILON {
                        level[v] = level[u] + 1;
                        queue.push_back(v);
                    }
                }
            }
            if level[self.sink] == usize::MAX {
                probe!();
                return;
            }

            let mut next = vec![0; n];
            loop {
                let pushed = self.blocking(self.source, f64::INFINITY, &level, &mut next);
                if pushed <= EPSILON {
                    break;
                }
                probe!();
            }
        }
    }

    fn blocking(&mut self, u: usize, limit: f64, level: &[usize], next: &mut [usize]) -> f64 {
        if u == self.sink {
            return limit;
        }
        while next[u] < self.neighbors[u].len() {
            let v = self.neighbors[u][next[u]];
            let residual = self.residual(u, v);
            if level[v] == level[u] + 1 && residual > EPSILON {
                let pushed = self.blocking(v, limit.min(residual), level, next);
                if pushed > EPSILON {
                    self.push(u, v, pushed);
                    return pushed;
                }
            }
            next[u] += 1;
        }
        0.0
    }
}

fn edmonds_karp(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let mut network = Network::new(graph, args)?;
    network.edmonds_karp();
    Ok(Output::Number(network.value()))
}

fn dinic(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let mut network = Network::new(graph, args)?;
    network.dinic();
    Ok(Output::Number(network.value()))
}

/// Node pairs whose capacity the maximum flow exhausts. `0` when the flow
/// cannot be computed.
fn saturated_edges(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let Ok(mut network) = Network::new(graph, args) else {
        return Ok(Output::Number(0.0));
    };
    network.edmonds_karp();
    let n = network.capacity.len();
    let saturated = (0..n)
        .flat_map(|u| (0..n).map(move |v| (u, v)))
        .filter(|&(u, v)| network.capacity[u][v] > EPSILON && network.residual(u, v) <= EPSILON)
        .count();
    Ok(Output::Number(saturated as f64))
}
