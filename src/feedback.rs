//! Deciding whether a mutated graph is worth keeping.
//!
//! A [`FeedbackOracle`] accumulates everything it has observed so far (output
//! fingerprints, covered lines, covered branch arcs, failure messages) and
//! answers "is this graph new and interesting?" for one of several
//! [`Strategy`]s. Its state only ever grows; construct a new oracle to start
//! over.
//!
//! The oracle is `Sync` and is meant to be shared behind an [`Arc`]. Several
//! oracles may also share one instrumentation through
//! [`FeedbackOracle::with_instrumentation`], in which case coverage
//! measurements are serialized by the instrumentation's lock.

use crate::coverage::{self, Branch, Line, ProbeTracer, SharedInstrumentation};
use crate::executor::{self, ExecErrorKind};
use crate::fingerprint::{Fingerprint, Reducer};
use crate::{Error, Executor, Graph, NodeId, Outcome, Result};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The feedback kinds that can be requested by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    /// Output novelty over the target's default signal.
    #[default]
    Regular,
    /// New executed lines.
    Coverage,
    /// Output novelty, or failing that, new executed lines.
    Combination,
    /// New branch arcs.
    Branch,
    /// Novelty of the hop count of shortest paths.
    HopCount,
    /// Novelty of the number of negative edges along shortest paths.
    NegativeEdges,
    /// Novelty of the distribution of strongly connected component sizes.
    ComponentDistribution,
    /// Novelty of the bucketed share of singleton components.
    TrivialRatio,
    /// Novelty of the number of saturated edges in a maximum flow.
    SaturatedEdges,
    /// Novelty of the maximum degree within a spanning tree.
    MaxDegree,
    /// Never interesting.
    None,
}

impl FeedbackKind {
    /// Every kind, in the order they are documented.
    pub const ALL: [FeedbackKind; 11] = [
        FeedbackKind::Regular,
        FeedbackKind::Coverage,
        FeedbackKind::Combination,
        FeedbackKind::Branch,
        FeedbackKind::HopCount,
        FeedbackKind::NegativeEdges,
        FeedbackKind::ComponentDistribution,
        FeedbackKind::TrivialRatio,
        FeedbackKind::SaturatedEdges,
        FeedbackKind::MaxDegree,
        FeedbackKind::None,
    ];

    /// The kind's name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            FeedbackKind::Regular => "regular",
            FeedbackKind::Coverage => "coverage",
            FeedbackKind::Combination => "combination",
            FeedbackKind::Branch => "branch",
            FeedbackKind::HopCount => "hop_count",
            FeedbackKind::NegativeEdges => "negative_edges",
            FeedbackKind::ComponentDistribution => "component_distribution",
            FeedbackKind::TrivialRatio => "trivial_ratio",
            FeedbackKind::SaturatedEdges => "saturated_edges",
            FeedbackKind::MaxDegree => "max_degree",
            FeedbackKind::None => "none",
        }
    }

    /// How graphs are judged under this kind.
    pub fn strategy(self) -> Strategy {
        match self {
            FeedbackKind::Coverage => Strategy::LineCoverage,
            FeedbackKind::Branch => Strategy::BranchCoverage,
            FeedbackKind::Combination => Strategy::Combination,
            FeedbackKind::None => Strategy::Disabled,
            _ => Strategy::Novelty,
        }
    }

    /// Whether this kind needs a target-specific signal.
    pub fn is_specialized(self) -> bool {
        !matches!(
            self,
            FeedbackKind::Regular
                | FeedbackKind::Coverage
                | FeedbackKind::Combination
                | FeedbackKind::Branch
                | FeedbackKind::None
        )
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeedbackKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeedbackKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::config(format!("unknown feedback kind `{s}`")))
    }
}

/// How the oracle judges a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Interesting iff the signal's fingerprint is unseen, or the signal
    /// fails with an unseen message.
    Novelty,
    /// Interesting iff the signal executes a line never executed before.
    LineCoverage,
    /// Interesting iff the signal takes a branch arc never taken before.
    BranchCoverage,
    /// [`Novelty`][Strategy::Novelty], or failing that,
    /// [`LineCoverage`][Strategy::LineCoverage].
    Combination,
    /// Never interesting.
    Disabled,
}

/// Picks the node arguments a signal is run with.
pub type ArgSelector = fn(&Graph) -> Vec<NodeId>;

fn no_args(_: &Graph) -> Vec<NodeId> {
    Vec::new()
}

/// What the oracle runs on a graph, and how it reduces the result.
#[derive(Clone)]
pub struct Signal {
    /// The executor to observe.
    pub executor: Arc<dyn Executor>,
    /// How its output is fingerprinted.
    pub reducer: Arc<dyn Reducer>,
    /// How its node arguments are chosen.
    pub args: ArgSelector,
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").finish_non_exhaustive()
    }
}

impl Signal {
    /// A signal that runs `executor` without node arguments.
    pub fn new(executor: impl Executor + 'static, reducer: impl Reducer + 'static) -> Self {
        Self {
            executor: Arc::new(executor),
            reducer: Arc::new(reducer),
            args: no_args,
        }
    }

    /// Choose the executor's node arguments with `args`.
    pub fn with_args(mut self, args: ArgSelector) -> Self {
        self.args = args;
        self
    }
}

#[derive(Default)]
struct FeedbackState {
    observed_outputs: HashSet<Fingerprint>,
    algorithm_errors: BTreeSet<String>,
    other_errors: BTreeSet<String>,
    exception_graphs: Vec<(Graph, String)>,
    observed_lines: BTreeSet<Line>,
    observed_branches: BTreeSet<Branch>,
}

impl FeedbackState {
    /// Remember a failure message. Returns `true` the first time a message is
    /// seen, in which case the graph is logged alongside it.
    fn record_failure(&mut self, kind: ExecErrorKind, message: String, graph: &Graph) -> bool {
        let seen = match kind {
            ExecErrorKind::Algorithm => &mut self.algorithm_errors,
            ExecErrorKind::Other | ExecErrorKind::Panic => &mut self.other_errors,
        };
        if !seen.insert(message.clone()) {
            return false;
        }
        log::debug!("new exception: {message}");
        self.exception_graphs.push((graph.clone(), message));
        true
    }
}

/// The accumulated observations behind the "new and interesting?" decision.
///
/// # Example
///
/// ```
/// use graphfuzz::feedback::{FeedbackOracle, Signal};
/// use graphfuzz::fingerprint::DefaultReducer;
/// use graphfuzz::{ExecError, Graph, NodeId, Output};
///
/// let node_count = |g: &Graph, _: &[NodeId]| -> Result<Output, ExecError> {
///     Ok(Output::Number(g.node_count() as f64))
/// };
/// let signal = Signal::new(node_count, DefaultReducer);
/// let oracle = FeedbackOracle::new();
///
/// let mut g = Graph::new(false, false);
/// g.add_node(0);
/// assert!(oracle.is_new_output(&g, &signal));
/// assert!(!oracle.is_new_output(&g, &signal));
/// g.add_node(1);
/// assert!(oracle.is_new_output(&g, &signal));
/// ```
pub struct FeedbackOracle {
    state: Mutex<FeedbackState>,
    instrumentation: SharedInstrumentation,
}

impl Default for FeedbackOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FeedbackOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("FeedbackOracle")
            .field("observed_outputs", &state.observed_outputs.len())
            .field("observed_lines", &state.observed_lines.len())
            .field("observed_branches", &state.observed_branches.len())
            .field("exception_graphs", &state.exception_graphs.len())
            .finish()
    }
}

impl FeedbackOracle {
    /// A fresh oracle with its own [`ProbeTracer`].
    pub fn new() -> Self {
        Self::with_instrumentation(coverage::shared(ProbeTracer::new()))
    }

    /// A fresh oracle measuring coverage through `instrumentation`, which may
    /// be shared with other oracles.
    pub fn with_instrumentation(instrumentation: SharedInstrumentation) -> Self {
        Self {
            state: Mutex::new(FeedbackState::default()),
            instrumentation,
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Judge `graph` under `strategy`.
    pub fn is_interesting(&self, strategy: Strategy, graph: &Graph, signal: &Signal) -> bool {
        match strategy {
            Strategy::Novelty => self.is_new_output(graph, signal),
            Strategy::LineCoverage => self.is_new_line_coverage(graph, signal),
            Strategy::BranchCoverage => self.is_new_branch_coverage(graph, signal),
            Strategy::Combination => {
                self.is_new_output(graph, signal) || self.is_new_line_coverage(graph, signal)
            }
            Strategy::Disabled => false,
        }
    }

    /// Output novelty.
    ///
    /// A failing signal is interesting the first time its (categorized)
    /// message is seen.
    pub fn is_new_output(&self, graph: &Graph, signal: &Signal) -> bool {
        let args = (signal.args)(graph);
        let outcome = executor::execute(&*signal.executor, graph, &args);
        let mut state = self.state();
        match outcome {
            Outcome::Ok(output) => {
                let fingerprint = signal.reducer.reduce(&output);
                let new = state.observed_outputs.insert(fingerprint);
                if new {
                    log::trace!("new output fingerprint for {graph}");
                }
                new
            }
            Outcome::Failed(e) => state.record_failure(e.kind, e.categorized(), graph),
        }
    }

    /// Line coverage novelty.
    ///
    /// Failures are remembered but are never interesting by themselves.
    pub fn is_new_line_coverage(&self, graph: &Graph, signal: &Signal) -> bool {
        let (outcome, lines, _) = self.measure(graph, signal);
        let mut state = self.state();
        if let Outcome::Failed(e) = outcome {
            state.record_failure(e.kind, e.categorized(), graph);
        }
        let before = state.observed_lines.len();
        state.observed_lines.extend(lines);
        state.observed_lines.len() > before
    }

    /// Branch coverage novelty.
    ///
    /// Failures are remembered but are never interesting by themselves.
    pub fn is_new_branch_coverage(&self, graph: &Graph, signal: &Signal) -> bool {
        let (outcome, _, branches) = self.measure(graph, signal);
        let mut state = self.state();
        if let Outcome::Failed(e) = outcome {
            state.record_failure(e.kind, e.categorized(), graph);
        }
        let before = state.observed_branches.len();
        state.observed_branches.extend(branches);
        state.observed_branches.len() > before
    }

    fn measure(
        &self,
        graph: &Graph,
        signal: &Signal,
    ) -> (Outcome, BTreeSet<Line>, BTreeSet<Branch>) {
        let args = (signal.args)(graph);
        let mut instrumentation = self
            .instrumentation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        instrumentation.start();
        let outcome = executor::execute(&*signal.executor, graph, &args);
        instrumentation.stop();
        instrumentation.save();
        (
            outcome,
            instrumentation.executed_lines(),
            instrumentation.executed_branches(),
        )
    }

    /// Record a failure that did not come from running a signal, such as a
    /// timeout. Returns `true` the first time `message` is seen.
    pub fn record_exception(&self, graph: &Graph, message: impl Into<String>) -> bool {
        self.state()
            .record_failure(ExecErrorKind::Other, message.into(), graph)
    }

    /// Every `(graph, message)` pair logged the first time a failure message
    /// was seen.
    pub fn exception_graphs(&self) -> Vec<(Graph, String)> {
        self.state().exception_graphs.clone()
    }

    /// Distinct failure messages seen so far, algorithm-specific ones first.
    pub fn exceptions(&self) -> Vec<String> {
        let state = self.state();
        state
            .algorithm_errors
            .iter()
            .chain(&state.other_errors)
            .cloned()
            .collect()
    }

    /// Number of distinct output fingerprints seen so far.
    pub fn observed_output_count(&self) -> usize {
        self.state().observed_outputs.len()
    }

    /// Number of distinct lines covered so far.
    pub fn observed_line_count(&self) -> usize {
        self.state().observed_lines.len()
    }

    /// Number of distinct branch arcs covered so far.
    pub fn observed_branch_count(&self) -> usize {
        self.state().observed_branches.len()
    }
}
