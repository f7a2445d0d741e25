/*!

# Fuzzing Your Own Algorithm

Everything the fuzz loop needs to know about an algorithm is bundled in a
[`Target`][crate::targets::Target]:

* one or more named [`Implementation`s][crate::oracle::Implementation], each
  an [`Executor`][crate::Executor] taking a graph and node arguments,
* the kind of graph it takes (directed or not, parallel edges or not) and the
  weights seed graphs carry,
* how node arguments are drawn for each test,
* a [`Signal`][crate::feedback::Signal] for output-novelty feedback: which
  executor to observe and how to fingerprint its output,
* optionally, specialized signals for particular
  [`FeedbackKind`s][crate::feedback::FeedbackKind] and
  [`Metamorphism`s][crate::oracle::Metamorphism] for metamorphic testing.

Plain functions and closures of type `Fn(&Graph, &[NodeId]) -> Result<Output,
ExecError>` are executors. Return an [`ExecError`][crate::ExecError] for
inputs the algorithm rejects; a panic is caught and treated the same way.

```
# fn foo() -> graphfuzz::Result<()> {
use graphfuzz::config::FuzzConfig;
use graphfuzz::feedback::Signal;
use graphfuzz::fingerprint::DefaultReducer;
use graphfuzz::oracle::{Implementation, TestOracle};
use graphfuzz::scheduler::MemScheduler;
use graphfuzz::seeds::{self, Weights};
use graphfuzz::targets::Target;
use graphfuzz::{ExecError, Fuzzer, Graph, NodeId, Output, Rng};

fn count_edges(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    Ok(Output::Number(graph.edge_count() as f64))
}

// Only right for forests.
fn nodes_minus_one(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    if graph.is_empty() {
        return Err(ExecError::algorithm("empty graph"));
    }
    Ok(Output::Number((graph.node_count() - 1) as f64))
}

let target = Target::new("edges", false, Signal::new(count_edges, DefaultReducer))
    .weights(Weights::Unweighted)
    .implementation(Implementation::new("count", count_edges))
    .implementation(Implementation::new("nodes_minus_one", nodes_minus_one));

// A triangle tells the two apart.
let mut triangle = Graph::new(false, false);
triangle.add_edge(0, 1, None);
triangle.add_edge(1, 2, None);
triangle.add_edge(2, 0, None);
let found = target.differential().test(&triangle, &mut Rng::new(0));
assert_eq!(found.len(), 1);

// The fuzzer finds such a graph on its own.
let config = FuzzConfig::new().iterations(20).max_rounds(10).seed(3);
let seeds = vec![seeds::single_node(&target)];
let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
let summary = fuzzer.run(seeds)?;
println!("{summary}");
# Ok(())
# }
# foo().unwrap();
```

## Coverage Feedback

The `coverage`, `branch` and `combination` feedback kinds only see code marked
with [`probe!`][crate::probe]. Put a probe at each decision point of your
implementation that you want the fuzzer to try to reach:

```
use graphfuzz::{probe, ExecError, Graph, NodeId, Output};

fn has_self_loop(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    for edge in graph.edges() {
        if edge.source == edge.target {
            probe!();
            return Ok(Output::Number(1.0));
        }
    }
    probe!();
    Ok(Output::Number(0.0))
}
# let _ = has_self_loop;
```

 */
