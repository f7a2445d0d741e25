//! Strongly connected components.

use super::{require_directed, Indexed, Target};
use crate::feedback::{FeedbackKind, Signal};
use crate::fingerprint::{DefaultReducer, Fingerprint, Reducer};
use crate::oracle::relations::{AddEdgeMonotone, AddIsolatedNode, RelabelNodes, ReverseEdges};
use crate::oracle::Implementation;
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, VecDeque};
use std::hash::{Hash, Hasher};

const WHAT: &str = "strongly connected components";
const UNVISITED: usize = usize::MAX;

pub(super) fn target() -> Target {
    Target::new("scc", true, Signal::new(tarjan, DefaultReducer))
        .implementation(Implementation::new("tarjan", tarjan))
        .implementation(Implementation::new("kosaraju", kosaraju))
        .implementation(Implementation::new("reachability", reachability))
        .specialization(
            FeedbackKind::ComponentDistribution,
            Signal::new(tarjan, component_distribution),
        )
        .specialization(FeedbackKind::TrivialRatio, Signal::new(tarjan, trivial_ratio))
        .metamorphism(ReverseEdges { tolerance: 0.0 })
        .metamorphism(RelabelNodes { tolerance: 0.0 })
        .metamorphism(AddIsolatedNode)
        .metamorphism(AddEdgeMonotone)
}

fn tarjan(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_directed(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut next = 0;
    let mut components = BTreeSet::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next;
        low[root] = next;
        next += 1;
        stack.push(root);
        on_stack[root] = true;

        // (node, next successor to look at)
        let mut work = vec![(root, 0)];
        while let Some((v, i)) = work.pop() {
            if let Some(&(w, _)) = g.out[v].get(i) {
                work.push((v, i + 1));
                if index[w] == UNVISITED {
                    probe!();
                    index[w] = next;
                    low[w] = next;
                    next += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push((w, 0));
                } else if on_stack[w] {
                    probe!();
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            if low[v] == index[v] {
                probe!();
                let mut component = BTreeSet::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.insert(g.ids[w]);
                    if w == v {
                        break;
                    }
                }
                components.insert(component);
            }
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[v]);
            }
        }
    }
    Ok(Output::Components(components))
}

fn kosaraju(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_directed(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();

    // Finishing order of a depth-first search.
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0)];
        while let Some((v, i)) = stack.pop() {
            match g.out[v].get(i) {
                Some(&(w, _)) => {
                    stack.push((v, i + 1));
                    if !visited[w] {
                        probe!();
                        visited[w] = true;
                        stack.push((w, 0));
                    }
                }
                None => order.push(v),
            }
        }
    }

    let reversed = Indexed::reversed(graph);
    let mut assigned = vec![false; n];
    let mut components = BTreeSet::new();
    for &root in order.iter().rev() {
        if assigned[root] {
            continue;
        }
        probe!();
        assigned[root] = true;
        let mut component = BTreeSet::from([reversed.ids[root]]);
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            for &(w, _) in &reversed.out[v] {
                if !assigned[w] {
                    assigned[w] = true;
                    component.insert(reversed.ids[w]);
                    stack.push(w);
                }
            }
        }
        components.insert(component);
    }
    Ok(Output::Components(components))
}

/// Two nodes share a component iff each reaches the other.
fn reachability(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_directed(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();
    let reach: Vec<Vec<bool>> = (0..n).map(|v| reachable_from(&g, v)).collect();

    let mut assigned = vec![false; n];
    let mut components = BTreeSet::new();
    for v in 0..n {
        if assigned[v] {
            continue;
        }
        let component: BTreeSet<NodeId> = (0..n)
            .filter(|&u| reach[v][u] && reach[u][v])
            .inspect(|&u| assigned[u] = true)
            .map(|u| g.ids[u])
            .collect();
        if component.len() == 1 {
            probe!();
        }
        components.insert(component);
    }
    Ok(Output::Components(components))
}

fn reachable_from(g: &Indexed, source: usize) -> Vec<bool> {
    let mut seen = vec![false; g.len()];
    seen[source] = true;
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        for &(w, _) in &g.out[v] {
            if !seen[w] {
                seen[w] = true;
                queue.push_back(w);
            }
        }
    }
    seen
}

/// A hash of the component sizes, largest first, modulo 10000.
fn component_distribution(output: &Output) -> Fingerprint {
    let Output::Components(components) = output else {
        return DefaultReducer.reduce(output);
    };
    let mut sizes: Vec<usize> = components.iter().map(BTreeSet::len).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    let mut hasher = DefaultHasher::new();
    sizes.hash(&mut hasher);
    Fingerprint::Int((hasher.finish() % 10_000) as i64)
}

/// The share of singleton components, in quarters: `0` to `4`.
fn trivial_ratio(output: &Output) -> Fingerprint {
    let Output::Components(components) = output else {
        return DefaultReducer.reduce(output);
    };
    if components.is_empty() {
        return Fingerprint::Int(0);
    }
    let singletons = components.iter().filter(|c| c.len() == 1).count();
    let percent = (singletons as f64 / components.len() as f64 * 100.0) as i64;
    Fingerprint::Int(percent / 25)
}

