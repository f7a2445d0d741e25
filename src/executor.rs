//! Executors: the algorithms under test, and the values they produce.
//!
//! An [`Executor`] takes a graph plus a (possibly empty) list of node
//! arguments and returns either an [`Output`] or an [`ExecError`]. Failures
//! are ordinary values, and [`execute`] additionally turns panics into
//! failures, so a misbehaving implementation can never take the fuzzer down.

use crate::{Graph, NodeId};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// The result of running an algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// A single number: a path length, a flow value, a tree weight, a count.
    Number(#[serde(with = "number_repr")] f64),
    /// A partition of (some of) the nodes.
    Components(BTreeSet<BTreeSet<NodeId>>),
    /// Scores attached to node pairs.
    ScoredPairs(Vec<(NodeId, NodeId, f64)>),
    /// A score per node.
    Scores(BTreeMap<NodeId, f64>),
    /// A weighted subgraph, such as a spanning forest.
    Tree(Graph),
}

impl Output {
    /// Rename every node id mentioned in this output through `map`. Ids
    /// missing from `map` are kept.
    pub fn relabel(&self, map: &BTreeMap<NodeId, NodeId>) -> Output {
        let rename = |n: &NodeId| map.get(n).copied().unwrap_or(*n);
        match self {
            Output::Number(x) => Output::Number(*x),
            Output::Components(cs) => Output::Components(
                cs.iter().map(|c| c.iter().map(rename).collect()).collect(),
            ),
            Output::ScoredPairs(ps) => Output::ScoredPairs(
                ps.iter()
                    .map(|(u, v, s)| (rename(u), rename(v), *s))
                    .collect(),
            ),
            Output::Scores(s) => Output::Scores(s.iter().map(|(n, x)| (rename(n), *x)).collect()),
            Output::Tree(g) => Output::Tree(g.relabel(map)),
        }
    }

    /// The number, if this is an [`Output::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Output::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Compare two outputs, allowing an absolute difference of `tolerance`
    /// between floating point values.
    ///
    /// Two `NaN`s compare equal, and infinities compare equal when their
    /// signs agree. Discrete structures must match exactly; scored pairs are
    /// matched regardless of order and orientation. A spanning
    /// structure is compared by total weight and edge count, since several
    /// distinct minimum trees may exist.
    ///
    /// # Example
    ///
    /// ```
    /// use graphfuzz::Output;
    ///
    /// let a = Output::Number(1.0);
    /// assert!(a.approx_eq(&Output::Number(1.0 + 1e-9), 1e-6));
    /// assert!(!a.approx_eq(&Output::Number(1.1), 1e-6));
    /// assert!(Output::Number(f64::NAN).approx_eq(&Output::Number(f64::NAN), 0.0));
    /// ```
    pub fn approx_eq(&self, other: &Output, tolerance: f64) -> bool {
        match (self, other) {
            (Output::Number(a), Output::Number(b)) => approx_eq(*a, *b, tolerance),
            (Output::Components(a), Output::Components(b)) => a == b,
            (Output::ScoredPairs(a), Output::ScoredPairs(b)) => {
                let (a, b) = (sorted_pairs(a), sorted_pairs(b));
                a.len() == b.len()
                    && a.iter().zip(&b).all(|((au, av, a), (bu, bv, b))| {
                        au == bu && av == bv && approx_eq(*a, *b, tolerance)
                    })
            }
            (Output::Scores(a), Output::Scores(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((an, a), (bn, b))| {
                        an == bn && approx_eq(*a, *b, tolerance)
                    })
            }
            (Output::Tree(a), Output::Tree(b)) => {
                a.edge_count() == b.edge_count()
                    && approx_eq(a.total_weight(), b.total_weight(), tolerance)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Number(x) => write!(f, "{x}"),
            Output::Components(cs) => write!(f, "{} components", cs.len()),
            Output::ScoredPairs(ps) => write!(f, "{} scored pairs", ps.len()),
            Output::Scores(s) => write!(f, "{} scores", s.len()),
            Output::Tree(g) => write!(f, "tree of weight {}", g.total_weight()),
        }
    }
}

/// Pairs are unordered: `(u, v)` and `(v, u)` name the same pair.
fn sorted_pairs(pairs: &[(NodeId, NodeId, f64)]) -> Vec<(NodeId, NodeId, f64)> {
    let mut pairs: Vec<_> = pairs
        .iter()
        .map(|&(u, v, s)| (u.min(v), u.max(v), s))
        .collect();
    pairs.sort_by_key(|&(u, v, _)| (u, v));
    pairs
}

/// Compare two floats with an absolute tolerance.
///
/// Two `NaN`s are equal; infinities are equal when their signs agree.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tolerance
}

/// The broad category of an executor failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecErrorKind {
    /// The algorithm rejected the input in a way specific to graph
    /// algorithms: no path, negative cycle, unbounded flow.
    Algorithm,
    /// Any other failure.
    Other,
    /// The implementation panicked.
    Panic,
}

/// A failed execution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecError {
    /// What kind of failure this was.
    pub kind: ExecErrorKind,
    /// A human-readable description.
    pub message: String,
}

impl ExecError {
    /// An algorithm-specific failure.
    pub fn algorithm(message: impl Into<String>) -> Self {
        Self {
            kind: ExecErrorKind::Algorithm,
            message: message.into(),
        }
    }

    /// A generic failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: ExecErrorKind::Other,
            message: message.into(),
        }
    }

    fn panic(message: String) -> Self {
        Self {
            kind: ExecErrorKind::Panic,
            message,
        }
    }

    /// The message with its category prefix, as recorded by the feedback
    /// oracle.
    pub fn categorized(&self) -> String {
        match self.kind {
            ExecErrorKind::Algorithm => format!("Algorithm Error: {}", self.message),
            ExecErrorKind::Other | ExecErrorKind::Panic => format!("Error: {}", self.message),
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecError {}

/// Either an output or a failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The executor returned a value.
    Ok(Output),
    /// The executor failed or panicked.
    Failed(ExecError),
}

impl Outcome {
    /// The output, if the execution succeeded.
    pub fn output(&self) -> Option<&Output> {
        match self {
            Outcome::Ok(o) => Some(o),
            Outcome::Failed(_) => None,
        }
    }

    /// Whether the execution failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl From<Result<Output, ExecError>> for Outcome {
    fn from(r: Result<Output, ExecError>) -> Self {
        match r {
            Ok(o) => Outcome::Ok(o),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// An algorithm under test.
///
/// Implemented for every `Fn(&Graph, &[NodeId]) -> Result<Output, ExecError>`
/// closure that is `Send + Sync`.
pub trait Executor: Send + Sync {
    /// Run the algorithm on `graph` with node arguments `args`.
    fn execute(&self, graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError>;
}

impl<F> Executor for F
where
    F: Fn(&Graph, &[NodeId]) -> Result<Output, ExecError> + Send + Sync,
{
    fn execute(&self, graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
        self(graph, args)
    }
}

/// Run `executor`, catching panics.
///
/// # Example
///
/// ```
/// use graphfuzz::{executor::execute, ExecError, Graph, NodeId, Outcome, Output};
///
/// let boom = |_: &Graph, _: &[NodeId]| -> Result<Output, ExecError> { panic!("boom") };
/// match execute(&boom, &Graph::default(), &[]) {
///     Outcome::Failed(e) => assert_eq!(e.message, "boom"),
///     Outcome::Ok(_) => unreachable!(),
/// }
/// ```
pub fn execute(executor: &dyn Executor, graph: &Graph, args: &[NodeId]) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(graph, args))) {
        Ok(result) => result.into(),
        Err(payload) => Outcome::Failed(ExecError::panic(panic_message(&*payload))),
    }
}

/// The message a panic was raised with.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<panicked>".to_string()
    }
}

mod number_repr {
    use crate::graph::{format_non_finite, parse_non_finite};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        if x.is_finite() {
            Repr::Number(*x).serialize(s)
        } else {
            Repr::Text(format_non_finite(*x).into()).serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(x) => Ok(x),
            Repr::Text(t) => {
                parse_non_finite(&t).ok_or_else(|| de::Error::custom(format!("invalid number `{t}`")))
            }
        }
    }
}
