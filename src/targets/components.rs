//! Connected components, ignoring edge direction.

use super::{DisjointSets, Indexed, Target};
use crate::feedback::Signal;
use crate::fingerprint::{DefaultReducer, Fingerprint, Reducer};
use crate::oracle::relations::{AddEdgeMonotone, AddIsolatedNode, RelabelNodes};
use crate::oracle::Implementation;
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub(super) fn target() -> Target {
    Target::new("components", false, Signal::new(bfs, component_count))
        .weights(Weights::Unweighted)
        .implementation(Implementation::new("union_find", union_find))
        .implementation(Implementation::new("bfs", bfs))
        .metamorphism(RelabelNodes { tolerance: 0.0 })
        .metamorphism(AddIsolatedNode)
        .metamorphism(AddEdgeMonotone)
}

fn union_find(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::new(graph);
    let mut sets = DisjointSets::new(g.len());
    for edge in graph.edges() {
        let (u, v) = (g.position(edge.source)?, g.position(edge.target)?);
        if sets.union(u, v) {
            probe!();
        }
    }

    let mut parts: BTreeMap<usize, BTreeSet<NodeId>> = BTreeMap::new();
    for (i, &id) in g.ids.iter().enumerate() {
        parts.entry(sets.find(i)).or_default().insert(id);
    }
    Ok(Output::Components(parts.into_values().collect()))
}

fn bfs(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    let g = Indexed::undirected(graph);
    let mut seen = vec![false; g.len()];
    let mut components = BTreeSet::new();
    for root in 0..g.len() {
        if seen[root] {
            continue;
        }
        probe!();
        seen[root] = true;
        let mut component = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            component.insert(g.ids[v]);
            for &(w, _) in &g.out[v] {
                if !seen[w] {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        components.insert(component);
    }
    Ok(Output::Components(components))
}

fn component_count(output: &Output) -> Fingerprint {
    match output {
        Output::Components(components) => components.len().into(),
        other => DefaultReducer.reduce(other),
    }
}
