//! Minimum spanning forests of undirected graphs.
//!
//! Graphs are normalized before testing: a `NaN` weight becomes `0` and a
//! missing weight becomes `1`.

use super::{require_undirected, Cost, DisjointSets, Indexed, Target};
use crate::feedback::{FeedbackKind, Signal};
use crate::fingerprint::{DefaultReducer, Fingerprint, Reducer};
use crate::oracle::relations::{AddIsolatedNode, RelabelNodes, ScaleWeights};
use crate::oracle::Implementation;
use crate::seeds::Weights;
use crate::{probe, Edge, ExecError, Graph, NodeId, Output};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const WHAT: &str = "minimum spanning tree";
const TOLERANCE: f64 = 1e-6;

pub(super) fn target() -> Target {
    Target::new("mst", false, Signal::new(normalized_kruskal, weight_bucket))
        .weights(Weights::Signed)
        .implementation(Implementation::new("kruskal", kruskal))
        .implementation(Implementation::new("prim", prim))
        .implementation(Implementation::new("boruvka", boruvka))
        .tolerance(TOLERANCE)
        .preprocess(normalize_weights)
        .specialization(
            FeedbackKind::MaxDegree,
            Signal::new(max_tree_degree, DefaultReducer),
        )
        .metamorphism(ScaleWeights::proportional(TOLERANCE))
        .metamorphism(RelabelNodes {
            tolerance: TOLERANCE,
        })
        .metamorphism(AddIsolatedNode)
}

fn normalize_weights(graph: &mut Graph) {
    graph.map_weights(|w| match w {
        None => Some(1.0),
        Some(w) if w.is_nan() => Some(0.0),
        w => w,
    });
}

/// A forest over every node of `graph`, holding `edges`.
fn forest<'a>(graph: &Graph, edges: impl IntoIterator<Item = &'a Edge>) -> Output {
    let mut tree = Graph::new(false, false);
    for node in graph.nodes() {
        tree.add_node(node);
    }
    for e in edges {
        tree.add_edge(e.source, e.target, e.weight);
    }
    Output::Tree(tree)
}

fn weight(e: &Edge) -> f64 {
    e.weight.unwrap_or(1.0)
}

fn kruskal(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let mut edges: Vec<&Edge> = graph.edges().iter().collect();
    edges.sort_by(|a, b| weight(a).total_cmp(&weight(b)));

    let mut sets = DisjointSets::new(g.len());
    let mut chosen = Vec::new();
    for e in edges {
        if sets.union(g.position(e.source)?, g.position(e.target)?) {
            probe!();
            chosen.push(e);
        }
    }
    Ok(forest(graph, chosen))
}

fn prim(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();
    // Incident edge indices per node.
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, e) in graph.edges().iter().enumerate() {
        let (u, v) = (g.position(e.source)?, g.position(e.target)?);
        if u != v {
            incident[u].push(i);
            incident[v].push(i);
        }
    }

    let edges = graph.edges();
    let mut in_tree = vec![false; n];
    let mut chosen = Vec::new();
    for root in 0..n {
        if in_tree[root] {
            continue;
        }
        probe!();
        in_tree[root] = true;
        let mut heap: BinaryHeap<Reverse<(Cost, usize, usize)>> = incident[root]
            .iter()
            .map(|&i| Reverse((Cost(weight(&edges[i])), i, root)))
            .collect();
        while let Some(Reverse((_, i, from))) = heap.pop() {
            let e = &edges[i];
            let to = if g.ids[from] == e.source {
                g.position(e.target)?
            } else {
                g.position(e.source)?
            };
            if in_tree[to] {
                continue;
            }
            in_tree[to] = true;
            chosen.push(e);
            for &j in &incident[to] {
                heap.push(Reverse((Cost(weight(&edges[j])), j, to)));
            }
        }
    }
    Ok(forest(graph, chosen))
}

fn boruvka(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let edges = graph.edges();
    let ends: Vec<(usize, usize)> = edges
        .iter()
        .map(|e| Ok((g.position(e.source)?, g.position(e.target)?)))
        .collect::<Result<_, ExecError>>()?;

    let mut sets = DisjointSets::new(g.len());
    let mut chosen = Vec::new();
    loop {
        // Cheapest edge leaving each component, ties broken by index.
        let mut cheapest: Vec<Option<usize>> = vec![None; g.len()];
        for (i, &(u, v)) in ends.iter().enumerate() {
            let (ru, rv) = (sets.find(u), sets.find(v));
            if ru == rv {
                continue;
            }
            for r in [ru, rv] {
                let better = cheapest[r].map_or(true, |c| {
                    (Cost(weight(&edges[i])), i) < (Cost(weight(&edges[c])), c)
                });
                if better {
                    cheapest[r] = Some(i);
                }
            }
        }
        if cheapest.iter().all(Option::is_none) {
            break;
        }
        probe!();
        for i in cheapest.into_iter().flatten() {
            let (u, v) = ends[i];
            if sets.union(u, v) {
                chosen.push(&edges[i]);
            }
        }
    }
    Ok(forest(graph, chosen))
}

fn normalized_kruskal(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let mut graph = graph.clone();
    normalize_weights(&mut graph);
    kruskal(&graph, args)
}

/// The largest degree within the spanning forest.
fn max_tree_degree(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    let out = normalized_kruskal(graph, args)?;
    let Output::Tree(tree) = &out else {
        return Ok(out);
    };
    let max = tree.degrees().into_values().max().unwrap_or(0);
    Ok(Output::Number(max as f64))
}

/// `(node count, sign, power-of-two magnitude)` of the total weight.
fn weight_bucket(output: &Output) -> Fingerprint {
    let Output::Tree(tree) = output else {
        return DefaultReducer.reduce(output);
    };
    let total = tree.total_weight();
    let bucket = if total == 0.0 || !total.is_finite() {
        Fingerprint::tuple([Fingerprint::number(total)])
    } else {
        Fingerprint::tuple([
            Fingerprint::Int(total.signum() as i64),
            Fingerprint::Int(total.abs().log2().floor() as i64),
        ])
    };
    Fingerprint::tuple([tree.node_count().into(), bucket])
}
