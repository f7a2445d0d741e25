//! Graph algorithms to fuzz.
//!
//! A [`Target`] bundles everything the fuzz loop needs to know about one
//! algorithm: the kind of graph it takes, several independent
//! implementations to compare, how node arguments are drawn, the feedback
//! signals, and the metamorphic relations that hold for it.
//!
//! The built-in targets are looked up with [`by_name`]. Their implementations
//! mark branch points with [`probe!`][crate::probe] so coverage feedback has
//! something to observe.

use crate::config::TestMethod;
use crate::feedback::{FeedbackKind, Signal};
use crate::oracle::{
    Arguments, Differential, GraphPredicate, Implementation, Metamorphic, Metamorphism,
    TestOracle,
};
use crate::seeds::Weights;
use crate::{Error, ExecError, Graph, NodeId, Output, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod adamic_adar;
mod bcc;
mod components;
mod harmonic;
mod jaccard;
mod max_flow;
mod max_matching;
mod mst;
mod scc;
mod shortest_path;

/// The names of the built-in targets.
pub const NAMES: [&str; 10] = [
    "scc",
    "components",
    "bcc",
    "shortest_path",
    "mst",
    "max_flow",
    "max_matching",
    "harmonic",
    "adamic_adar",
    "jaccard",
];

/// The names accepted by [`by_name`].
pub fn names() -> &'static [&'static str] {
    &NAMES
}

/// Look up a built-in target.
///
/// The historical names `SCC`, `BCC`, `STPL`, `MST`, `MAXFV`, `MaxMatching`,
/// `HarmonicCentrality`, `AdamicAdar` and `JaccardSimilarity` are accepted as
/// well.
///
/// ```
/// let scc = graphfuzz::targets::by_name("scc").unwrap();
/// assert!(scc.is_directed());
/// assert!(graphfuzz::targets::by_name("nope").unwrap_err().is_config());
/// ```
pub fn by_name(name: &str) -> Result<Target> {
    Ok(match name {
        "scc" | "SCC" => scc::target(),
        "components" => components::target(),
        "bcc" | "BCC" => bcc::target(),
        "shortest_path" | "STPL" => shortest_path::target(),
        "mst" | "MST" => mst::target(),
        "max_flow" | "MAXFV" => max_flow::target(),
        "max_matching" | "MaxMatching" => max_matching::target(),
        "harmonic" | "HarmonicCentrality" => harmonic::target(),
        "adamic_adar" | "AdamicAdar" => adamic_adar::target(),
        "jaccard" | "JaccardSimilarity" => jaccard::target(),
        _ => {
            return Err(Error::config(format!(
                "unknown target `{name}`, expected one of: {}",
                NAMES.join(", ")
            )))
        }
    })
}

/// An algorithm under test.
///
/// # Example
///
/// ```
/// use graphfuzz::feedback::{FeedbackKind, Signal};
/// use graphfuzz::fingerprint::DefaultReducer;
/// use graphfuzz::oracle::Implementation;
/// use graphfuzz::targets::Target;
/// use graphfuzz::{ExecError, Graph, NodeId, Output};
///
/// fn edges(g: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
///     Ok(Output::Number(g.edge_count() as f64))
/// }
///
/// let target = Target::new("edge_count", false, Signal::new(edges, DefaultReducer))
///     .implementation(Implementation::new("edges", edges));
/// assert_eq!(target.name(), "edge_count");
/// assert!(target.metamorphic("edges", 10).is_ok());
/// assert!(target.metamorphic("other", 10).unwrap_err().is_config());
/// ```
#[derive(Clone)]
pub struct Target {
    name: String,
    directed: bool,
    multigraph: bool,
    weights: Weights,
    implementations: Vec<Implementation>,
    arguments: Arguments,
    tolerance: f64,
    sentinel: Option<Output>,
    precondition: Option<GraphPredicate>,
    preprocess: Option<fn(&mut Graph)>,
    signal: Signal,
    specializations: Vec<(FeedbackKind, Signal)>,
    metamorphisms: Vec<Arc<dyn Metamorphism>>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.implementations.iter().map(|i| i.name.as_str()).collect();
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("directed", &self.directed)
            .field("multigraph", &self.multigraph)
            .field("implementations", &names)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// A target taking simple graphs, with no implementations yet, whose
    /// default feedback signal is `signal`.
    pub fn new(name: impl Into<String>, directed: bool, signal: Signal) -> Self {
        Self {
            name: name.into(),
            directed,
            multigraph: false,
            weights: Weights::NonNegative,
            implementations: Vec::new(),
            arguments: Arguments::None,
            tolerance: 0.0,
            sentinel: None,
            precondition: None,
            preprocess: None,
            signal,
            specializations: Vec::new(),
            metamorphisms: Vec::new(),
        }
    }

    /// Take multigraphs instead of simple graphs.
    pub fn multigraph(mut self, multigraph: bool) -> Self {
        self.multigraph = multigraph;
        self
    }

    /// The weights random seed graphs carry.
    pub fn weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Add an implementation.
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

    /// Compare failed implementations as if they had returned `sentinel`.
    pub fn sentinel(mut self, sentinel: Output) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    /// Skip graphs rejected by `precondition`.
    pub fn precondition(mut self, precondition: GraphPredicate) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Normalize graphs with `preprocess` before testing them.
    pub fn preprocess(mut self, preprocess: fn(&mut Graph)) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    /// Use `signal` for feedback of the given specialized kind.
    pub fn specialization(mut self, kind: FeedbackKind, signal: Signal) -> Self {
        self.specializations.push((kind, signal));
        self
    }

    /// Add a metamorphic relation that holds for every implementation.
    pub fn metamorphism(mut self, metamorphism: impl Metamorphism + 'static) -> Self {
        self.metamorphisms.push(Arc::new(metamorphism));
        self
    }

    /// The target's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the target takes directed graphs.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether the target takes multigraphs.
    pub fn is_multigraph(&self) -> bool {
        self.multigraph
    }

    /// The weights random seed graphs carry.
    pub fn seed_weights(&self) -> Weights {
        self.weights
    }

    /// The implementations, in comparison order.
    pub fn implementations(&self) -> &[Implementation] {
        &self.implementations
    }

    /// An empty graph of the kind this target takes.
    pub fn empty_graph(&self) -> Graph {
        Graph::new(self.directed, self.multigraph)
    }

    /// The feedback kinds that are meaningful for this target: every general
    /// kind and the specialized kinds it has a signal for.
    pub fn feedback_kinds(&self) -> Vec<FeedbackKind> {
        FeedbackKind::ALL
            .into_iter()
            .filter(|kind| {
                !kind.is_specialized() || self.specializations.iter().any(|(k, _)| k == kind)
            })
            .collect()
    }

    /// The signal to observe for `kind`.
    ///
    /// A specialized kind this target has no signal for falls back to the
    /// default signal, with a warning.
    pub fn signal_for(&self, kind: FeedbackKind) -> Signal {
        if !kind.is_specialized() {
            return self.signal.clone();
        }
        match self.specializations.iter().find(|(k, _)| *k == kind) {
            Some((_, signal)) => signal.clone(),
            None => {
                log::warn!(
                    "feedback `{kind}` is not specialized for target `{}`, using its default signal",
                    self.name
                );
                self.signal.clone()
            }
        }
    }

    /// A differential oracle over every implementation.
    pub fn differential(&self) -> Differential {
        let mut oracle = self
            .implementations
            .iter()
            .cloned()
            .fold(Differential::new(), Differential::implementation)
            .arguments(self.arguments)
            .tolerance(self.tolerance);
        if let Some(sentinel) = &self.sentinel {
            oracle = oracle.sentinel(sentinel.clone());
        }
        if let Some(precondition) = self.precondition {
            oracle = oracle.precondition(precondition);
        }
        if let Some(preprocess) = self.preprocess {
            oracle = oracle.preprocess(preprocess);
        }
        oracle
    }

    /// A metamorphic oracle over the implementation named `algorithm`.
    pub fn metamorphic(&self, algorithm: &str, attempts: usize) -> Result<Metamorphic> {
        let Some(implementation) = self.implementations.iter().find(|i| i.name == algorithm)
        else {
            let known: Vec<&str> = self.implementations.iter().map(|i| i.name.as_str()).collect();
            return Err(Error::config(format!(
                "unknown algorithm `{algorithm}` for target `{}`, expected one of: {}",
                self.name,
                known.join(", ")
            )));
        };
        let mut oracle = self
            .metamorphisms
            .iter()
            .cloned()
            .fold(
                Metamorphic::new(implementation.clone()),
                Metamorphic::shared_metamorphism,
            )
            .arguments(self.arguments)
            .attempts(attempts);
        if let Some(precondition) = self.precondition {
            oracle = oracle.precondition(precondition);
        }
        if let Some(preprocess) = self.preprocess {
            oracle = oracle.preprocess(preprocess);
        }
        Ok(oracle)
    }

    /// The oracle for `method`.
    pub fn oracle(&self, method: &TestMethod, attempts: usize) -> Result<Arc<dyn TestOracle>> {
        let oracle: Arc<dyn TestOracle> = match method {
            TestMethod::Differential => Arc::new(self.differential()),
            TestMethod::Metamorphic { algorithm } => {
                Arc::new(self.metamorphic(algorithm, attempts)?)
            }
        };
        Ok(oracle)
    }
}

/// A missing weight counts as `1`.
pub(crate) fn weight_or_one(weight: Option<f64>) -> f64 {
    weight.unwrap_or(1.0)
}

pub(crate) fn require_directed(graph: &Graph, what: &str) -> std::result::Result<(), ExecError> {
    if graph.is_directed() {
        Ok(())
    } else {
        Err(ExecError::algorithm(format!("{what} not implemented for undirected type")))
    }
}

pub(crate) fn require_undirected(graph: &Graph, what: &str) -> std::result::Result<(), ExecError> {
    if graph.is_directed() {
        Err(ExecError::algorithm(format!("{what} not implemented for directed type")))
    } else {
        Ok(())
    }
}

/// The two highest-degree nodes, used as `[source, target]` by feedback
/// signals. A lone node is both.
pub(crate) fn top_two(graph: &Graph) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = graph.nodes_by_degree().into_iter().take(2).collect();
    if let [only] = nodes[..] {
        nodes.push(only);
    }
    nodes
}

/// A graph re-indexed to `0..n`, for array-based algorithms.
pub(crate) struct Indexed {
    pub(crate) ids: Vec<NodeId>,
    pub(crate) index: BTreeMap<NodeId, usize>,
    pub(crate) out: Vec<Vec<(usize, Option<f64>)>>,
}

impl Indexed {
    /// Outgoing adjacency. Undirected edges go both ways.
    pub(crate) fn new(graph: &Graph) -> Self {
        Self::from_lists(graph.adjacency())
    }

    /// Incoming adjacency.
    pub(crate) fn reversed(graph: &Graph) -> Self {
        Self::from_lists(graph.reverse_adjacency())
    }

    /// Adjacency ignoring edge direction.
    pub(crate) fn undirected(graph: &Graph) -> Self {
        let mut lists = graph.adjacency();
        if graph.is_directed() {
            for (node, incoming) in graph.reverse_adjacency() {
                lists.entry(node).or_default().extend(incoming);
            }
        }
        Self::from_lists(lists)
    }

    fn from_lists(lists: BTreeMap<NodeId, Vec<(NodeId, Option<f64>)>>) -> Self {
        let ids: Vec<NodeId> = lists.keys().copied().collect();
        let index: BTreeMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let out = lists
            .into_values()
            .map(|neighbors| {
                neighbors
                    .into_iter()
                    .filter_map(|(n, w)| index.get(&n).map(|&i| (i, w)))
                    .collect()
            })
            .collect();
        Self { ids, index, out }
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn position(&self, node: NodeId) -> std::result::Result<usize, ExecError> {
        self.index
            .get(&node)
            .copied()
            .ok_or_else(|| ExecError::algorithm(format!("Node {node} not found in graph")))
    }

    /// Positions of a `[source, target]` argument pair.
    pub(crate) fn endpoints(
        &self,
        args: &[NodeId],
    ) -> std::result::Result<(usize, usize), ExecError> {
        match *args {
            [source, target] => Ok((self.position(source)?, self.position(target)?)),
            _ => Err(ExecError::other(format!(
                "expected a source and a target node, got {} arguments",
                args.len()
            ))),
        }
    }
}

/// Union-find over `0..n` with path halving.
pub(crate) struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. Returns `false` if they were already
    /// one set.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return false;
        }
        self.parent[b] = a;
        true
    }
}

/// An `f64` heap key ordered by [`f64::total_cmp`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cost(pub(crate) f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
