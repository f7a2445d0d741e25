use super::{Arguments, Discrepancy, GraphPredicate, Implementation, TestOracle};
use crate::executor::{self, Outcome, Output};
use crate::{Graph, NodeId, Rng};

/// Compares every pair of implementations on the same input.
///
/// # Example
///
/// ```
/// use graphfuzz::oracle::{Differential, Implementation, TestOracle};
/// use graphfuzz::{ExecError, Graph, NodeId, Output, Rng};
///
/// let three = |_: &Graph, _: &[NodeId]| -> Result<Output, ExecError> { Ok(Output::Number(3.0)) };
/// let four = |_: &Graph, _: &[NodeId]| -> Result<Output, ExecError> { Ok(Output::Number(4.0)) };
///
/// let oracle = Differential::new()
///     .implementation(Implementation::new("a", three))
///     .implementation(Implementation::new("b", four));
///
/// let found = oracle.test(&Graph::default(), &mut Rng::new(0));
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].message, "Results of a and b are different for a graph!");
/// ```
#[derive(Debug, Default)]
pub struct Differential {
    implementations: Vec<Implementation>,
    arguments: Arguments,
    tolerance: f64,
    sentinel: Option<Output>,
    precondition: Option<GraphPredicate>,
    preprocess: Option<fn(&mut Graph)>,
}

impl Differential {
    /// An oracle with no implementations, no node arguments and exact
    /// comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implementation. Implementations are compared in the order
    /// they are added.
    pub fn implementation(mut self, implementation: Implementation) -> Self {
        self.implementations.push(implementation);
        self
    }

    /// Choose how node arguments are drawn.
    pub fn arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Allow floating point results to differ by up to `tolerance`.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Compare a failed implementation as if it had returned `sentinel`.
    ///
    /// Without a sentinel, failures compare equal to each other and unequal
    /// to every success.
    pub fn sentinel(mut self, sentinel: Output) -> Self {
        self.sentinel = Some(sentinel);
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

    /// The implementations, in comparison order.
    pub fn implementations(&self) -> &[Implementation] {
        &self.implementations
    }

    fn agree(&self, a: &Outcome, b: &Outcome) -> bool {
        let substitute = |o: &Outcome| -> Option<Output> {
            match o {
                Outcome::Ok(out) => Some(out.clone()),
                Outcome::Failed(_) => self.sentinel.clone(),
            }
        };
        match (substitute(a), substitute(b)) {
            (Some(a), Some(b)) => a.approx_eq(&b, self.tolerance),
            (None, None) => true,
            _ => false,
        }
    }

    fn compare(&self, graph: &Graph, args: &[NodeId]) -> Option<String> {
        let results: Vec<(&str, Outcome)> = self
            .implementations
            .iter()
            .filter(|imp| imp.accepts(graph))
            .map(|imp| (imp.name.as_str(), executor::execute(&*imp.executor, graph, args)))
            .collect();

        let mut messages = Vec::new();
        for (i, (name_a, a)) in results.iter().enumerate() {
            for (name_b, b) in &results[i + 1..] {
                if !self.agree(a, b) {
                    log::debug!("{name_a} returned {a:?} but {name_b} returned {b:?}");
                    messages.push(format!(
                        "Results of {name_a} and {name_b} are different for a graph!"
                    ));
                }
            }
        }
        (!messages.is_empty()).then(|| messages.join("--"))
    }
}

impl TestOracle for Differential {
    fn test(&self, graph: &Graph, rng: &mut Rng) -> Vec<Discrepancy> {
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

        rounds
            .into_iter()
            .filter_map(|args| {
                let message = self.compare(&prepared, &args)?;
                Some(Discrepancy {
                    message,
                    graph: graph.clone(),
                    args,
                    mutated: None,
                })
            })
            .collect()
    }
}
