//! Test oracles: deciding whether an input exposes a bug.
//!
//! * [`Differential`] runs several independent implementations of the same
//!   algorithm and reports any pair that disagrees.
//! * [`Metamorphic`] runs one implementation on an input and on a transformed
//!   variant of it, and reports when the two results violate the relation the
//!   transformation is known to preserve.
//!
//! Both implement [`TestOracle`], which is what the fuzz loop drives.

use crate::{Executor, Graph, NodeId, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod differential;
mod metamorphic;
pub mod relations;

pub use differential::Differential;
pub use metamorphic::{Checker, Metamorphic, Metamorphism, Transformed, DEFAULT_ATTEMPTS};

/// An input on which the implementations under test misbehaved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// What went wrong. Identical messages are deduplicated by the bug store.
    pub message: String,
    /// The offending input.
    pub graph: Graph,
    /// The node arguments it was run with.
    pub args: Vec<NodeId>,
    /// For metamorphic violations, the transformed input and its arguments.
    pub mutated: Option<(Graph, Vec<NodeId>)>,
}

/// Something that checks a graph for bugs.
pub trait TestOracle: Send + Sync {
    /// Check `graph`, returning every discrepancy found.
    fn test(&self, graph: &Graph, rng: &mut Rng) -> Vec<Discrepancy>;
}

/// How node arguments are drawn for each test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Arguments {
    /// The algorithm takes no node arguments.
    #[default]
    None,
    /// Run `rounds` times, each with a random pair of distinct nodes as
    /// `[source, target]`. Graphs with fewer than two nodes are skipped.
    NodePairs {
        /// How many pairs to try per graph.
        rounds: usize,
    },
}

impl Arguments {
    /// Draw the argument lists for one test, or `None` if `graph` cannot be
    /// tested with this strategy.
    pub fn draw(&self, graph: &Graph, rng: &mut Rng) -> Option<Vec<Vec<NodeId>>> {
        match *self {
            Arguments::None => Some(vec![Vec::new()]),
            Arguments::NodePairs { rounds } => {
                let nodes: Vec<NodeId> = graph.nodes().collect();
                if nodes.len() < 2 {
                    return None;
                }
                let pairs = (0..rounds.max(1))
                    .filter_map(|_| {
                        let i = rng.gen_index(nodes.len())?;
                        let j = rng.gen_index(nodes.len() - 1)?;
                        let j = if j >= i { j + 1 } else { j };
                        Some(vec![nodes[i], nodes[j]])
                    })
                    .collect();
                Some(pairs)
            }
        }
    }
}

/// A graph predicate.
pub type GraphPredicate = fn(&Graph) -> bool;

/// A named executor, optionally restricted to the graphs it supports.
#[derive(Clone)]
pub struct Implementation {
    /// The name used in discrepancy messages.
    pub name: String,
    /// The implementation itself.
    pub executor: Arc<dyn Executor>,
    /// When present, the implementation only runs on graphs it accepts.
    pub guard: Option<GraphPredicate>,
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("name", &self.name)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl Implementation {
    /// An unguarded implementation.
    pub fn new(name: impl Into<String>, executor: impl Executor + 'static) -> Self {
        Self {
            name: name.into(),
            executor: Arc::new(executor),
            guard: None,
        }
    }

    /// Only run this implementation on graphs accepted by `guard`.
    pub fn guarded(mut self, guard: GraphPredicate) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Whether this implementation supports `graph`.
    pub fn accepts(&self, graph: &Graph) -> bool {
        self.guard.map_or(true, |guard| guard(graph))
    }
}
