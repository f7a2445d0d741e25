use super::{Arguments, Discrepancy, GraphPredicate, Implementation, TestOracle};
use crate::executor::{self, Outcome, Output};
use crate::{Graph, NodeId, Rng};
use std::fmt;
use std::sync::Arc;

/// Decides whether the result on a transformed input is consistent with the
/// result on the original input.
pub type Checker = Box<dyn Fn(&Outcome) -> bool + Send>;

/// A transformed input, plus the check its result must pass.
pub struct Transformed {
    /// The transformed graph.
    pub graph: Graph,
    /// The transformed node arguments.
    pub args: Vec<NodeId>,
    /// The expected relation to the original result.
    pub checker: Checker,
}

impl fmt::Debug for Transformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformed")
            .field("graph", &self.graph)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A transformation with a known effect on an algorithm's result.
pub trait Metamorphism: Send + Sync {
    /// A short name used in discrepancy messages.
    fn name(&self) -> &str;

    /// Transform `graph` (run with `args`, producing `result`).
    ///
    /// Returns `None` when the transformation does not apply to this graph or
    /// this kind of result.
    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed>;
}

/// The number of transformations tried per input by default.
pub const DEFAULT_ATTEMPTS: usize = 10;

/// Checks one implementation against transformed variants of each input.
///
/// # Example
///
/// ```
/// use graphfuzz::oracle::{relations::AddIsolatedNode, Implementation, Metamorphic, TestOracle};
/// use graphfuzz::{ExecError, Graph, NodeId, Output, Rng};
///
/// // Wrong: an isolated node does not change the number of edges.
/// let buggy = |g: &Graph, _: &[NodeId]| -> Result<Output, ExecError> {
///     Ok(Output::Number((g.edge_count() + g.node_count()) as f64))
/// };
/// let oracle = Metamorphic::new(Implementation::new("buggy", buggy))
///     .metamorphism(AddIsolatedNode);
///
/// let mut g = Graph::new(false, false);
/// g.add_edge(0, 1, None);
/// let found = oracle.test(&g, &mut Rng::new(0));
/// assert_eq!(found.len(), 1);
/// assert!(found[0].mutated.is_some());
/// ```
pub struct Metamorphic {
    implementation: Implementation,
    metamorphisms: Vec<Arc<dyn Metamorphism>>,
    arguments: Arguments,
    attempts: usize,
    precondition: Option<GraphPredicate>,
    preprocess: Option<fn(&mut Graph)>,
}

impl fmt::Debug for Metamorphic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.metamorphisms.iter().map(|m| m.name()).collect();
        f.debug_struct("Metamorphic")
            .field("implementation", &self.implementation)
            .field("metamorphisms", &names)
            .field("arguments", &self.arguments)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl Metamorphic {
    /// An oracle for `implementation` with no transformations yet.
    pub fn new(implementation: Implementation) -> Self {
        Self {
            implementation,
            metamorphisms: Vec::new(),
            arguments: Arguments::None,
            attempts: DEFAULT_ATTEMPTS,
            precondition: None,
            preprocess: None,
        }
    }

    /// Add a transformation to choose from.
    pub fn metamorphism(mut self, metamorphism: impl Metamorphism + 'static) -> Self {
        self.metamorphisms.push(Arc::new(metamorphism));
        self
    }

    /// Add an already shared transformation.
    pub fn shared_metamorphism(mut self, metamorphism: Arc<dyn Metamorphism>) -> Self {
        self.metamorphisms.push(metamorphism);
        self
    }

    /// Choose how node arguments are drawn. Only the first drawn argument
    /// list is used.
    pub fn arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// How many transformations to try per input.
    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Skip graphs rejected by `precondition`.
    pub fn precondition(mut self, precondition: GraphPredicate) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Normalize each graph with `preprocess` before running it.
    pub fn preprocess(mut self, preprocess: fn(&mut Graph)) -> Self {
        self.preprocess = Some(preprocess);
        self
    }
}

impl TestOracle for Metamorphic {
    fn test(&self, graph: &Graph, rng: &mut Rng) -> Vec<Discrepancy> {
        if self.metamorphisms.is_empty() || !self.implementation.accepts(graph) {
            return Vec::new();
        }
        if let Some(precondition) = self.precondition {
            if !precondition(graph) {
                return Vec::new();
            }
        }

        let mut prepared = graph.clone();
        if let Some(preprocess) = self.preprocess {
            preprocess(&mut prepared);
        }

        let Some(rounds) = self.arguments.draw(&prepared, rng) else {
            return Vec::new();
        };
        let args = rounds.into_iter().next().unwrap_or_default();

        let executor = &*self.implementation.executor;
        let original = match executor::execute(executor, &prepared, &args) {
            Outcome::Ok(output) => output,
            Outcome::Failed(e) => {
                log::trace!("{} failed on the original input: {e}", self.implementation.name);
                return Vec::new();
            }
        };

        for _ in 0..self.attempts {
            let Some(metamorphism) = rng.choose(self.metamorphisms.iter()) else {
                break;
            };
            let Some(transformed) = metamorphism.mutate(&prepared, &args, &original, rng) else {
                continue;
            };
            let outcome = executor::execute(executor, &transformed.graph, &transformed.args);
            if !(transformed.checker)(&outcome) {
                log::debug!(
                    "{} violates `{}`: {original:?} then {outcome:?}",
                    self.implementation.name,
                    metamorphism.name()
                );
                return vec![Discrepancy {
                    message: format!(
                        "Metamorphic relation {} violated by {}!",
                        metamorphism.name(),
                        self.implementation.name
                    ),
                    graph: graph.clone(),
                    args,
                    mutated: Some((transformed.graph, transformed.args)),
                }];
            }
        }
        Vec::new()
    }
}
