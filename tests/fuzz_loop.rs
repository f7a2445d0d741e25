use graphfuzz::config::{FuzzConfig, TestMethod};
use graphfuzz::feedback::{FeedbackKind, Signal};
use graphfuzz::fingerprint::{DefaultReducer, Fingerprint};
use graphfuzz::fuzzer::Campaign;
use graphfuzz::mutators::Operator;
use graphfuzz::oracle::Implementation;
use graphfuzz::persist;
use graphfuzz::scheduler::{MemScheduler, Scheduler};
use graphfuzz::seeds::{self, Weights};
use graphfuzz::targets::{self, Target};
use graphfuzz::{ExecError, Fuzzer, Graph, NodeId, Output, Rng, StopToken};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("graphfuzz-run-{}", uuid::Uuid::new_v4()))
}

/// A corpus that remembers its size after every admission.
struct Recording {
    inner: MemScheduler,
    sizes: Arc<Mutex<Vec<usize>>>,
}

impl Scheduler for Recording {
    fn add(&mut self, graph: Graph) -> graphfuzz::Result<()> {
        graph.validate()?;
        self.inner.add(graph)?;
        self.sizes.lock().unwrap().push(self.inner.len());
        Ok(())
    }

    fn get_graph(&mut self, rng: &mut Rng) -> graphfuzz::Result<Graph> {
        self.inner.get_graph(rng)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn snapshot(&mut self) -> graphfuzz::Result<Vec<Graph>> {
        self.inner.snapshot()
    }
}

/// A corpus whose writes fail once it holds `capacity` graphs.
struct FailingWrites {
    inner: MemScheduler,
    capacity: usize,
    error: fn() -> graphfuzz::Error,
}

impl FailingWrites {
    fn new(capacity: usize, error: fn() -> graphfuzz::Error) -> Self {
        Self {
            inner: MemScheduler::new(),
            capacity,
            error,
        }
    }
}

impl Scheduler for FailingWrites {
    fn add(&mut self, graph: Graph) -> graphfuzz::Result<()> {
        if self.inner.len() >= self.capacity {
            return Err((self.error)());
        }
        self.inner.add(graph)
    }

    fn get_graph(&mut self, rng: &mut Rng) -> graphfuzz::Result<Graph> {
        self.inner.get_graph(rng)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn snapshot(&mut self) -> graphfuzz::Result<Vec<Graph>> {
        self.inner.snapshot()
    }
}

fn disk_full() -> graphfuzz::Error {
    graphfuzz::Error::other("simulated disk write failure")
}

fn torn_log() -> graphfuzz::Error {
    graphfuzz::Error::corrupt_artifact("corpus.jsonl", "line 3: expected value")
}

fn count_edges(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    Ok(Output::Number(graph.edge_count() as f64))
}

// Wrong whenever the graph is not a tree.
fn nodes_minus_one(graph: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    Ok(Output::Number(graph.node_count().saturating_sub(1) as f64))
}

fn slow(graph: &Graph, args: &[NodeId]) -> Result<Output, ExecError> {
    std::thread::sleep(Duration::from_millis(500));
    count_edges(graph, args)
}

fn edges_target() -> Target {
    Target::new("edges", false, Signal::new(count_edges, DefaultReducer))
        .weights(Weights::Unweighted)
        .implementation(Implementation::new("count", count_edges))
        .implementation(Implementation::new("nodes_minus_one", nodes_minus_one))
}

#[test]
fn corpus_grows_monotonically() -> anyhow::Result<()> {
    let target = targets::by_name("components")?;
    let seeds = vec![seeds::single_node(&target)];
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let scheduler = Recording {
        inner: MemScheduler::new(),
        sizes: Arc::clone(&sizes),
    };
    let config = FuzzConfig::new()
        .iterations(10)
        .max_rounds(20)
        .operators([Operator::AddNode, Operator::AddEdge])
        .feedback(FeedbackKind::Regular)
        .seed(7);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(scheduler))?;
    let summary = fuzzer.run(seeds)?;

    assert_eq!(summary.rounds, 20);
    assert!(summary.executions > 0 && summary.executions <= 200);
    assert_eq!(summary.total_discrepancies(), 0);
    assert_eq!(summary.timeouts, 0);

    let sizes = sizes.lock().unwrap();
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    // New component counts keep appearing as the graph grows.
    assert!(summary.corpus_size > 1);
    assert_eq!(*sizes.last().unwrap(), summary.corpus_size);
    Ok(())
}

#[test]
fn disagreements_are_found_and_counted() -> anyhow::Result<()> {
    let target = edges_target();
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new().iterations(20).max_rounds(10).seed(3);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;

    let message = "Results of count and nodes_minus_one are different for a graph!";
    assert!(summary.discrepancies[message] > 0);
    assert_eq!(summary.discrepancies[message], fuzzer.bugs().count(message));
    assert!(summary.first_seen.contains_key(message));
    assert!(summary.to_string().contains(message));
    Ok(())
}

#[test]
fn slow_tests_time_out_and_the_loop_moves_on() -> anyhow::Result<()> {
    let target = Target::new("slow", false, Signal::new(count_edges, DefaultReducer))
        .implementation(Implementation::new("slow", slow))
        .implementation(Implementation::new("count", count_edges));
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .iterations(1)
        .max_rounds(1)
        .timeout(Duration::from_millis(50))
        .seed(1);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;

    assert_eq!(summary.executions, 1);
    assert_eq!(summary.timeouts, 1);
    assert_eq!(summary.infrastructure_errors, 0);
    assert_eq!(
        summary.exceptions,
        vec!["Timeout Error: Exceeded 0.05 seconds.".to_string()]
    );
    let logged = fuzzer.feedback().exception_graphs();
    assert_eq!(logged.len(), 1);
    // A timed-out graph is not admitted.
    assert_eq!(summary.corpus_size, 1);
    Ok(())
}

#[test]
fn artifacts_are_saved() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let target = edges_target();
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .iterations(10)
        .max_rounds(5)
        .discrepancy_cap(3)
        .output_dir(&dir)
        .seed(5);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;

    let corpus = persist::load_corpus(&dir.join("edges_corpus.json"));
    assert_eq!(corpus.len(), summary.corpus_size);

    let log = fs::read_to_string(dir.join("edges_discrepancies.jsonl"))?;
    let retained = log.lines().count() as u64;
    assert!(retained > 0);
    assert!(retained <= 3);
    assert!(retained <= summary.total_discrepancies());

    // No failures, so no exception log.
    assert!(!dir.join("edges_exceptions.json").exists());

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn a_stopped_fuzzer_only_admits_its_seeds() -> anyhow::Result<()> {
    let target = targets::by_name("scc")?;
    let seeds = seeds::random_graphs(&target, &mut Rng::new(0));
    let stop = StopToken::new();
    stop.stop();

    let mut fuzzer = Fuzzer::new(target, FuzzConfig::new(), Box::new(MemScheduler::new()))?
        .with_stop_token(stop.clone());
    assert!(fuzzer.stop_token().is_stopped());
    let summary = fuzzer.run(seeds)?;

    assert_eq!(summary.rounds, 0);
    assert_eq!(summary.executions, 0);
    assert_eq!(summary.corpus_size, seeds::RANDOM_GRAPHS);
    Ok(())
}

#[test]
fn bad_setups_are_config_errors() -> anyhow::Result<()> {
    let target = targets::by_name("mst")?;

    let err = Fuzzer::new(
        target.clone(),
        FuzzConfig::new().iterations(0),
        Box::new(MemScheduler::new()),
    )
    .unwrap_err();
    assert!(err.is_config());

    let err = Fuzzer::new(
        target.clone(),
        FuzzConfig::new().method(TestMethod::Metamorphic {
            algorithm: "christofides".into(),
        }),
        Box::new(MemScheduler::new()),
    )
    .unwrap_err();
    assert!(err.is_config());

    let mut fuzzer = Fuzzer::new(target, FuzzConfig::new(), Box::new(MemScheduler::new()))?;
    assert!(fuzzer.run(vec![]).unwrap_err().is_config());
    Ok(())
}

#[test]
fn metamorphic_runs_check_one_implementation() -> anyhow::Result<()> {
    let target = targets::by_name("scc")?;
    let seeds = seeds::random_graphs(&target, &mut Rng::new(1));
    let config = FuzzConfig::new()
        .method(TestMethod::parse("metamorphic", Some("kosaraju"))?)
        .iterations(5)
        .max_rounds(4)
        .seed(2);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;
    assert_eq!(summary.executions, 20);
    assert_eq!(summary.total_discrepancies(), 0);
    Ok(())
}

#[test]
fn specialized_feedback_drives_the_corpus() -> anyhow::Result<()> {
    let target = targets::by_name("scc")?;
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .feedback(FeedbackKind::ComponentDistribution)
        .iterations(10)
        .max_rounds(10)
        .seed(9);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;
    assert_eq!(summary.feedback, FeedbackKind::ComponentDistribution);
    assert!(summary.corpus_size > 1);
    assert!(fuzzer.feedback().observed_output_count() >= summary.corpus_size - 1);
    Ok(())
}

#[test]
fn campaigns_stop_at_their_time_limit() -> anyhow::Result<()> {
    let target = targets::by_name("shortest_path")?;
    let seeds = seeds::random_graphs(&target, &mut Rng::new(4));
    let config = FuzzConfig::new().iterations(5).seed(4);

    let results = Campaign::new(target, config)
        .feedbacks([FeedbackKind::HopCount, FeedbackKind::Coverage])
        .time_limit(Duration::from_millis(300))
        .run(seeds)?;

    let kinds: Vec<FeedbackKind> = results.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, [FeedbackKind::HopCount, FeedbackKind::Coverage]);
    for (kind, summary) in results {
        let summary = summary?;
        assert_eq!(summary.feedback, kind);
        assert!(summary.corpus_size >= seeds::RANDOM_GRAPHS);
    }
    Ok(())
}

#[test]
fn reducers_decide_what_counts_as_new() -> anyhow::Result<()> {
    // Every output looks the same, so nothing past the seed is admitted.
    let flat = |_: &Output| Fingerprint::Int(0);
    let target = Target::new("flat", false, Signal::new(count_edges, flat))
        .implementation(Implementation::new("a", count_edges))
        .implementation(Implementation::new("b", count_edges));
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new().iterations(10).max_rounds(5).seed(6);

    let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
    let summary = fuzzer.run(seeds)?;
    assert_eq!(summary.corpus_size, 1);
    assert_eq!(fuzzer.scheduler().len(), 1);
    Ok(())
}

#[test]
fn corpus_write_failures_do_not_end_the_run() -> anyhow::Result<()> {
    let target = targets::by_name("components")?;
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .iterations(10)
        .max_rounds(5)
        .operators([Operator::AddNode, Operator::AddEdge])
        .seed(7);

    let scheduler = FailingWrites::new(1, disk_full);
    let mut fuzzer = Fuzzer::new(target, config, Box::new(scheduler))?;
    let summary = fuzzer.run(seeds)?;

    assert_eq!(summary.rounds, 5);
    assert!(summary.executions > 0);
    // New component counts were found but could not be admitted.
    assert!(summary.infrastructure_errors > 0);
    assert_eq!(summary.corpus_size, 1);
    assert!(summary.to_string().contains("infrastructure errors"));
    Ok(())
}

#[test]
fn unadmittable_seeds_still_produce_a_summary() -> anyhow::Result<()> {
    let target = targets::by_name("scc")?;
    let seeds = seeds::random_graphs(&target, &mut Rng::new(2));
    let config = FuzzConfig::new().iterations(5).max_rounds(3).seed(2);

    let scheduler = FailingWrites::new(0, disk_full);
    let mut fuzzer = Fuzzer::new(target, config, Box::new(scheduler))?;
    let summary = fuzzer.run(seeds)?;

    assert_eq!(summary.infrastructure_errors, seeds::RANDOM_GRAPHS as u64);
    assert_eq!(summary.executions, 0);
    assert_eq!(summary.corpus_size, 0);
    Ok(())
}

#[test]
fn corrupt_artifacts_stop_the_run_after_finalizing() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let target = targets::by_name("components")?;
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .iterations(10)
        .max_rounds(5)
        .operators([Operator::AddNode, Operator::AddEdge])
        .output_dir(&dir)
        .seed(7);

    let scheduler = FailingWrites::new(1, torn_log);
    let mut fuzzer = Fuzzer::new(target, config, Box::new(scheduler))?;
    let err = fuzzer.run(seeds).unwrap_err();
    assert!(err.is_corrupt_artifact());

    // The corpus was still saved on the way out.
    let corpus = persist::load_corpus(&dir.join("components_corpus.json"));
    assert_eq!(corpus.len(), 1);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn one_failing_campaign_member_does_not_hide_the_others() -> anyhow::Result<()> {
    let dir = scratch_dir();
    // Damage that is not a torn final line cannot be recovered from.
    let damaged = dir.join("regular").join("components_discrepancies.jsonl");
    fs::create_dir_all(dir.join("regular"))?;
    fs::write(&damaged, "not json\n{}\n")?;

    let target = targets::by_name("components")?;
    let seeds = vec![seeds::single_node(&target)];
    let config = FuzzConfig::new()
        .iterations(3)
        .max_rounds(2)
        .output_dir(&dir)
        .seed(1);

    let results = Campaign::new(target, config)
        .feedbacks([FeedbackKind::None, FeedbackKind::Regular])
        .run(seeds)?;
    assert_eq!(results.len(), 2);

    let (kind, none) = &results[0];
    assert_eq!(*kind, FeedbackKind::None);
    assert_eq!(none.as_ref().map(|s| s.rounds).ok(), Some(2));

    let (kind, regular) = &results[1];
    assert_eq!(*kind, FeedbackKind::Regular);
    assert!(regular.as_ref().is_err_and(|e| e.is_corrupt_artifact()));

    fs::remove_dir_all(dir)?;
    Ok(())
}
