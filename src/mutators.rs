//! The structural graph mutator and its primitive operators.
//!
//! It is idiomatic to import this module with the alias `m`:
//!
//! ```rust
//! use graphfuzz::mutators as m;
//! ```
//!
//! [`GraphMutator`] registers one candidate per *applicable* primitive
//! operator, so a [`Session`][crate::Session] picks uniformly among the
//! operators that can actually do something to the current graph. Adding a
//! node is always applicable, which means the graph mutator never reports
//! exhaustion.

use crate::scheduler::Scheduler;
use crate::{Candidates, Graph, Mutate, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

mod combine;
mod primitives;

pub use combine::{combine, MAX_NODES};
pub use primitives::{add_edge, add_node, delete_edge, delete_node, reweight_edge, trim};

/// One primitive structural mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// Add a fresh node.
    AddNode,
    /// Remove a random node and its incident edges.
    DeleteNode,
    /// Add an edge between two random nodes.
    AddEdge,
    /// Remove a random edge.
    DeleteEdge,
    /// Assign a new weight to a random edge of a weighted graph.
    ReweightEdge,
    /// Remove a random fraction of the lowest-degree nodes.
    Trim,
    /// Splice in a graph drawn from the corpus.
    Combine,
}

impl Operator {
    /// Every operator, in registration order.
    pub const ALL: [Operator; 7] = [
        Operator::AddNode,
        Operator::DeleteNode,
        Operator::AddEdge,
        Operator::DeleteEdge,
        Operator::ReweightEdge,
        Operator::Trim,
        Operator::Combine,
    ];

    /// The operator's name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Operator::AddNode => "add_node",
            Operator::DeleteNode => "delete_node",
            Operator::AddEdge => "add_edge",
            Operator::DeleteEdge => "delete_edge",
            Operator::ReweightEdge => "reweight_edge",
            Operator::Trim => "trim",
            Operator::Combine => "combine",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| crate::Error::config(format!("unknown mutation operator `{s}`")))
    }
}

/// The stacked structural mutator for [`Graph`]s.
///
/// Without a corpus attached, the combine operator is never registered.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::{mutators::{GraphMutator, Operator}, Graph, Session};
///
/// let mut session = Session::new().seed(7);
/// let mut mutator = GraphMutator::new().operators([Operator::AddNode, Operator::AddEdge]);
///
/// let mut graph = Graph::new(false, false);
/// graph.add_node(0);
/// for _ in 0..10 {
///     session.stacked_mutate_with(&mut mutator, &mut graph)?;
/// }
///
/// // Only growing operators were enabled.
/// assert!(graph.node_count() > 1);
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
pub struct GraphMutator<'a> {
    operators: BTreeSet<Operator>,
    corpus: Option<&'a mut dyn Scheduler>,
}

impl Default for GraphMutator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphMutator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphMutator")
            .field("operators", &self.operators)
            .field("corpus", &self.corpus.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl<'a> GraphMutator<'a> {
    /// A mutator with every operator enabled and no corpus.
    pub fn new() -> Self {
        Self {
            operators: Operator::ALL.into_iter().collect(),
            corpus: None,
        }
    }

    /// Restrict the mutator to the given operators.
    pub fn operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }

    /// Draw combine operands from `corpus`.
    pub fn with_corpus(mut self, corpus: &'a mut dyn Scheduler) -> Self {
        self.corpus = Some(corpus);
        self
    }

    fn enabled(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }
}

impl Mutate<Graph> for GraphMutator<'_> {
    fn mutate(&mut self, c: &mut Candidates<'_>, graph: &mut Graph) -> Result<()> {
        if self.enabled(Operator::AddNode) {
            c.mutation(|_ctx| {
                add_node(graph);
                Ok(())
            })?;
        }

        if self.enabled(Operator::DeleteNode) && !graph.is_empty() {
            c.mutation(|ctx| {
                delete_node(graph, ctx.rng());
                Ok(())
            })?;
        }

        if self.enabled(Operator::AddEdge) && !graph.is_empty() {
            c.mutation(|ctx| {
                add_edge(graph, ctx.rng());
                Ok(())
            })?;
        }

        if self.enabled(Operator::DeleteEdge) && graph.edge_count() > 0 {
            c.mutation(|ctx| {
                delete_edge(graph, ctx.rng());
                Ok(())
            })?;
        }

        if self.enabled(Operator::ReweightEdge) && graph.edge_count() > 0 && graph.is_weighted() {
            c.mutation(|ctx| {
                reweight_edge(graph, ctx.rng());
                Ok(())
            })?;
        }

        if self.enabled(Operator::Trim) && graph.node_count() > 2 {
            c.mutation(|ctx| {
                trim(graph, ctx.rng());
                Ok(())
            })?;
        }

        if self.enabled(Operator::Combine) {
            if let Some(corpus) = self.corpus.as_deref_mut() {
                if !corpus.is_empty() {
                    c.mutation(|ctx| {
                        let other = corpus.get_graph(ctx.rng())?;
                        combine(graph, other, ctx.rng());
                        Ok(())
                    })?;
                }
            }
        }

        Ok(())
    }
}
