//! Biconnected components (blocks) of undirected graphs.
//!
//! Each block is reported as its node set. Self loops are ignored, and a node
//! without any other edge forms a block of its own.

use super::{require_undirected, DisjointSets, Indexed, Target};
use crate::executor::Outcome;
use crate::feedback::Signal;
use crate::fingerprint::DefaultReducer;
use crate::oracle::relations::{AddIsolatedNode, RelabelNodes};
use crate::oracle::{Implementation, Metamorphism, Transformed};
use crate::seeds::Weights;
use crate::{probe, ExecError, Graph, NodeId, Output, Rng};
use std::collections::{BTreeSet, VecDeque};

const WHAT: &str = "biconnected components";
const UNVISITED: usize = usize::MAX;

type Blocks = BTreeSet<BTreeSet<NodeId>>;

pub(super) fn target() -> Target {
    Target::new("bcc", false, Signal::new(hopcroft_tarjan, DefaultReducer))
        .weights(Weights::Unweighted)
        .implementation(Implementation::new("hopcroft_tarjan", hopcroft_tarjan))
        .implementation(Implementation::new("vertex_removal", vertex_removal))
        .metamorphism(RelabelNodes { tolerance: 0.0 })
        .metamorphism(AddIsolatedNode)
        .metamorphism(AddPendant)
}

fn has_proper_edge(g: &Indexed, v: usize) -> bool {
    g.out[v].iter().any(|&(w, _)| w != v)
}

/// One depth-first search per connected component, cutting blocks off an
/// edge stack whenever a child cannot reach above its parent.
fn hopcroft_tarjan(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();
    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut next = 0;
    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut blocks = Blocks::new();

    for root in 0..n {
        if disc[root] != UNVISITED {
            continue;
        }
        disc[root] = next;
        low[root] = next;
        next += 1;
        if !has_proper_edge(&g, root) {
            probe!();
            blocks.insert(BTreeSet::from([g.ids[root]]));
            continue;
        }

        // (node, its parent, next neighbor to look at)
        let mut work = vec![(root, UNVISITED, 0)];
        while let Some((v, parent, i)) = work.pop() {
            if let Some(&(w, _)) = g.out[v].get(i) {
                work.push((v, parent, i + 1));
                if w == v || w == parent {
                    continue;
                }
                if disc[w] == UNVISITED {
                    edges.push((v, w));
                    disc[w] = next;
                    low[w] = next;
                    next += 1;
                    work.push((w, v, 0));
                } else if disc[w] < disc[v] {
                    probe!();
                    edges.push((v, w));
                    low[v] = low[v].min(disc[w]);
                }
                continue;
            }

            if parent == UNVISITED {
                continue;
            }
            low[parent] = low[parent].min(low[v]);
            if low[v] >= disc[parent] {
                probe!();
                let mut block = BTreeSet::new();
                while let Some((a, b)) = edges.pop() {
                    block.insert(g.ids[a]);
                    block.insert(g.ids[b]);
                    if (a, b) == (parent, v) {
                        break;
                    }
                }
                blocks.insert(block);
            }
        }
    }
    Ok(Output::Components(blocks))
}

/// Component labels of every node once `removed` is taken out of the graph.
fn labels_without(g: &Indexed, removed: Option<usize>) -> Vec<usize> {
    let mut label = vec![UNVISITED; g.len()];
    let mut next = 0;
    for root in 0..g.len() {
        if label[root] != UNVISITED || Some(root) == removed {
            continue;
        }
        label[root] = next;
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            for &(w, _) in &g.out[v] {
                if label[w] == UNVISITED && Some(w) != removed {
                    label[w] = next;
                    queue.push_back(w);
                }
            }
        }
        next += 1;
    }
    label
}

/// Two edges share a block iff they are connected and no single node
/// separates them.
fn vertex_removal(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    require_undirected(graph, WHAT)?;
    let g = Indexed::new(graph);
    let n = g.len();
    let edges: Vec<(usize, usize)> = (0..n)
        .flat_map(|v| g.out[v].iter().map(move |&(w, _)| (v, w)))
        .filter(|&(v, w)| v < w)
        .collect();

    let whole = labels_without(&g, None);
    let without: Vec<Vec<usize>> = (0..n).map(|w| labels_without(&g, Some(w))).collect();
    // The endpoint of `(a, b)` that survives removing `w`.
    let survivor = |(a, b): (usize, usize), w: usize| if a == w { b } else { a };

    let mut sets = DisjointSets::new(edges.len());
    for (i, &e) in edges.iter().enumerate() {
        for (j, &f) in edges.iter().enumerate().skip(i + 1) {
            if whole[e.0] != whole[f.0] {
                continue;
            }
            let separated =
                (0..n).any(|w| without[w][survivor(e, w)] != without[w][survivor(f, w)]);
            if !separated && sets.union(i, j) {
                probe!();
            }
        }
    }

    let mut grouped: Vec<BTreeSet<NodeId>> = vec![BTreeSet::new(); edges.len()];
    for (i, &(a, b)) in edges.iter().enumerate() {
        let root = sets.find(i);
        grouped[root].insert(g.ids[a]);
        grouped[root].insert(g.ids[b]);
    }
    let mut blocks: Blocks = grouped.into_iter().filter(|b| !b.is_empty()).collect();
    for v in (0..n).filter(|&v| !has_proper_edge(&g, v)) {
        blocks.insert(BTreeSet::from([g.ids[v]]));
    }
    Ok(Output::Components(blocks))
}

/// Hang a fresh leaf off a random node. The new edge is a block of its own,
/// and replaces the node's singleton block if it had one.
#[derive(Clone, Copy, Debug)]
struct AddPendant;

impl Metamorphism for AddPendant {
    fn name(&self) -> &str {
        "pendant_insertion"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed> {
        let Output::Components(blocks) = result else {
            return None;
        };
        let anchor = rng.choose(graph.nodes())?;
        let leaf = graph.next_node_id();
        if graph.contains_node(leaf) {
            return None;
        }
        let mut expected = blocks.clone();
        expected.remove(&BTreeSet::from([anchor]));
        expected.insert(BTreeSet::from([anchor, leaf]));

        let mut grown = graph.clone();
        grown.add_edge(anchor, leaf, None);
        Some(Transformed {
            graph: grown,
            args: args.to_vec(),
            checker: Box::new(move |outcome: &Outcome| {
                matches!(outcome, Outcome::Ok(Output::Components(after)) if *after == expected)
            }),
        })
    }
}
