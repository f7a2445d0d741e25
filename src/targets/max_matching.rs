//! Maximum cardinality matching in bipartite graphs.
//!
//! The output is the number of matched edges. Both implementations reject
//! graphs that are not bipartite, so the fuzzer first drops every edge between
//! two nodes of equal id parity, which leaves an even/odd bipartition.

use super::{require_undirected, Indexed, Target};
use crate::executor::Outcome;
use crate::feedback::Signal;
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::{AddIsolatedNode, RelabelNodes};
use crate::oracle::{Implementation, Metamorphism, Transformed};
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output, Rng};
use std::collections::VecDeque;

const WHAT: &str = "bipartite matching";
const UNMATCHED: usize = usize::MAX;
const INFINITE: usize = usize::MAX;

pub(super) fn target() -> Target {
    Target::new("max_matching", false, Signal::new(hopcroft_karp, DefaultReducer))
        .weights(Weights::Unweighted)
        .implementation(Implementation::new("hopcroft_karp", hopcroft_karp))
        .implementation(Implementation::new("augmenting_paths", augmenting_paths))
        .preprocess(split_by_parity)
        .metamorphism(RelabelNodes { tolerance: 0.0 })
        .metamorphism(AddIsolatedNode)
        .metamorphism(AddDisjointEdge)
}

fn split_by_parity(graph: &mut Graph) {
    let same_side: Vec<usize> = graph
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.source % 2 == e.target % 2)
        .map(|(i, _)| i)
        .collect();
    for i in same_side.into_iter().rev() {
        graph.remove_edge_at(i);
    }
}

/// Two-color every component, `false` on the side its lowest node is on.
fn bipartition(g: &Indexed) -> Result<Vec<bool>, ExecError> {
    let mut color: Vec<Option<bool>> = vec![None; g.len()];
    for root in 0..g.len() {
        if color[root].is_some() {
            continue;
        }
        color[root] = Some(false);
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            let side = color[v] == Some(true);
            for &(w, _) in &g.out[v] {
                match color[w] {
                    None => {
                        color[w] = Some(!side);
                        queue.push_back(w);
                    }
                    Some(other) if other == side => {
                        probe!();
                        return Err(ExecError::algorithm("Graph is not bipartite."));
                    }
                    Some(_) => {}
                }
            }
        }
    }
    Ok(color.into_iter().map(|c| c == Some(true)).collect())
}

/// Left-side nodes of a bipartite graph.
fn left_side(graph: &Graph) -> Result<(Indexed, Vec<usize>), ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let side = bipartition(&g)?;
    let left = (0..g.len()).filter(|&v| !side[v]).collect();
    Ok((g, left))
}

/// Grow the matching by a maximal set of shortest vertex-disjoint augmenting
/// paths per phase.
fn hopcroft_karp(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    let (g, left) = left_side(graph)?;
    let mut mate = vec![UNMATCHED; g.len()];
    let mut dist = vec![INFINITE; g.len()];
    let mut size = 0;

    loop {
        let mut queue = VecDeque::new();
        for &u in &left {
            dist[u] = if mate[u] == UNMATCHED {
                queue.push_back(u);
                0
            } else {
                INFINITE
            };
        }
        let mut found = false;
        while let Some(u) = queue.pop_front() {
            for &(w, _) in &g.out[u] {
                match mate[w] {
                    UNMATCHED => found = true,
                    m if dist[m] == INFINITE => {
                        dist[m] = dist[u] + 1;
                        queue.push_back(m);
                    }
                    _ => {}
                }
            }
        }
        if !found {
            break;
        }

        probe!();
        for &u in &left {
            if mate[u] == UNMATCHED
                && dist[u] == 0
                && layered_augment(&g, u, &mut mate, &mut dist)
            {
                size += 1;
            }
        }
    }
    Ok(Output::Number(size as f64))
}

/// Only called on nodes with a finite layer.
fn layered_augment(g: &Indexed, u: usize, mate: &mut [usize], dist: &mut [usize]) -> bool {
    for &(w, _) in &g.out[u] {
        let m = mate[w];
        let free = m == UNMATCHED
            || (dist[m] == dist[u] + 1 && layered_augment(g, m, mate, dist));
        if free {
            mate[u] = w;
            mate[w] = u;
            return true;
        }
    }
    dist[u] = INFINITE;
    false
}

/// Kuhn's algorithm: one augmenting path search per left node.
fn augmenting_paths(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    let (g, left) = left_side(graph)?;
    let mut owner = vec![UNMATCHED; g.len()];
    let mut size = 0;
    for &u in &left {
        let mut visited = vec![false; g.len()];
        if augment(&g, u, &mut owner, &mut visited) {
            probe!();
            size += 1;
        }
    }
    Ok(Output::Number(size as f64))
}

fn augment(g: &Indexed, u: usize, owner: &mut [usize], visited: &mut [bool]) -> bool {
    for &(w, _) in &g.out[u] {
        if visited[w] {
            continue;
        }
        visited[w] = true;
        if owner[w] == UNMATCHED || augment(g, owner[w], owner, visited) {
            owner[w] = u;
            return true;
        }
    }
    false
}

/// Add an edge between two fresh nodes. It is matched on its own, so the
/// matching grows by exactly one.
#[derive(Clone, Copy, Debug)]
struct AddDisjointEdge;

impl Metamorphism for AddDisjointEdge {
    fn name(&self) -> &str {
        "disjoint_edge_insertion"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        _rng: &mut Rng,
    ) -> Option<Transformed> {
        let before = result.as_number()?;
        let u = graph.next_node_id();
        let v = u.checked_add(1)?;
        if graph.contains_node(u) || graph.contains_node(v) {
            return None;
        }
        let mut grown = graph.clone();
        grown.add_edge(u, v, None);
        Some(Transformed {
            graph: grown,
            args: args.to_vec(),
            checker: Box::new(move |outcome: &Outcome| {
                matches!(outcome, Outcome::Ok(Output::Number(after)) if *after == before + 1.0)
            }),
        })
    }
}
