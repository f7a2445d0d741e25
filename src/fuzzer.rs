//! The fuzz loop.
//!
//! A [`Fuzzer`] repeatedly picks a graph from its corpus, stacks a few random
//! mutations onto a copy, checks the copy for bugs with the target's test
//! oracle, and admits it to the corpus when the feedback oracle finds it new
//! and interesting. Each check runs on a worker thread under a time budget; a
//! worker that overruns is left behind and the loop moves on.
//!
//! The loop runs until its [`StopToken`] is triggered or the configured
//! number of rounds is done, and then reports a [`Summary`].

use crate::bugs::BugStore;
use crate::config::FuzzConfig;
use crate::executor::panic_message;
use crate::feedback::{FeedbackKind, FeedbackOracle, Signal, Strategy};
use crate::mutators::GraphMutator;
use crate::oracle::{Discrepancy, TestOracle};
use crate::persist;
use crate::scheduler::Scheduler;
use crate::targets::Target;
use crate::{Error, Graph, Result, Rng, Session};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

mod campaign;

/// Consecutive failed seed selections after which the loop gives up.
const MAX_FAILED_SELECTIONS: u32 = 100;

pub use campaign::Campaign;

/// A cooperative cancellation flag.
///
/// Clones share the flag. The fuzz loop checks it between iterations and
/// between seed selections.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    /// A token that has not been triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop holding this token to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`stop`][Self::stop] has been called.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a finished run did and found.
#[derive(Clone, Debug)]
pub struct Summary {
    /// The target's name.
    pub target: String,
    /// The feedback kind the run used.
    pub feedback: FeedbackKind,
    /// Mutated graphs tested.
    pub executions: u64,
    /// Seed selections.
    pub rounds: u64,
    /// Graphs in the corpus at the end.
    pub corpus_size: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Tests that exceeded the time budget.
    pub timeouts: u64,
    /// Workers abandoned on timeout that were still running at the end.
    pub abandoned_workers: usize,
    /// Tests whose worker died without a result.
    pub infrastructure_errors: u64,
    /// Occurrences per discrepancy message.
    pub discrepancies: BTreeMap<String, u64>,
    /// Time of first occurrence per discrepancy message.
    pub first_seen: BTreeMap<String, Duration>,
    /// Distinct failure messages seen by the feedback oracle, including
    /// timeouts.
    pub exceptions: Vec<String>,
}

impl Summary {
    /// Discrepancies found, counting repeats.
    pub fn total_discrepancies(&self) -> u64 {
        self.discrepancies.values().sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fuzzed `{}` with {} feedback", self.target, self.feedback)?;
        writeln!(
            f,
            "{} executions over {} rounds",
            self.executions, self.rounds
        )?;
        writeln!(f, "There were {} graphs saved in the corpus.", self.corpus_size)?;
        writeln!(
            f,
            "Time spent: {:.3} minutes.",
            self.elapsed.as_secs_f64() / 60.0
        )?;
        writeln!(
            f,
            "timeouts: {} ({} workers still running)",
            self.timeouts, self.abandoned_workers
        )?;
        writeln!(f, "infrastructure errors: {}", self.infrastructure_errors)?;
        writeln!(f, "distinct exceptions: {}", self.exceptions.len())?;
        write!(f, "Total Bugs Found:")?;
        for (message, count) in &self.discrepancies {
            let first = self.first_seen.get(message).copied().unwrap_or_default();
            write!(
                f,
                "\n{message}: {count} (first after {:.2}s)",
                first.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

enum OracleRun {
    Completed(Vec<Discrepancy>),
    TimedOut,
    Crashed(String),
}

#[derive(Debug, Default)]
struct Stats {
    executions: u64,
    rounds: u64,
    timeouts: u64,
    infrastructure_errors: u64,
}

/// A feedback-guided fuzz loop over one [`Target`].
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::config::FuzzConfig;
/// use graphfuzz::scheduler::MemScheduler;
/// use graphfuzz::{seeds, targets, Fuzzer};
///
/// let target = targets::by_name("components")?;
/// let seeds = vec![seeds::single_node(&target)];
/// let config = FuzzConfig::new().iterations(5).max_rounds(2).seed(1);
///
/// let mut fuzzer = Fuzzer::new(target, config, Box::new(MemScheduler::new()))?;
/// let summary = fuzzer.run(seeds)?;
/// assert_eq!(summary.executions, 10);
/// assert_eq!(summary.total_discrepancies(), 0);
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
pub struct Fuzzer {
    target: Target,
    config: FuzzConfig,
    scheduler: Box<dyn Scheduler>,
    feedback: Arc<FeedbackOracle>,
    strategy: Strategy,
    signal: Signal,
    oracle: Arc<dyn TestOracle>,
    bugs: BugStore,
    session: Session,
    stop: StopToken,
    abandoned: Vec<JoinHandle<()>>,
    stats: Stats,
}

impl fmt::Debug for Fuzzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fuzzer")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("corpus", &self.scheduler.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Fuzzer {
    /// A fuzzer for `target` drawing from and growing `scheduler`.
    ///
    /// Fails with a [`Config`][crate::ErrorKind::Config] error when `config`
    /// is invalid or names an algorithm the target does not have.
    pub fn new(target: Target, config: FuzzConfig, scheduler: Box<dyn Scheduler>) -> Result<Self> {
        config.validate()?;
        let oracle = target.oracle(&config.method, config.metamorphic_attempts)?;
        let signal = target.signal_for(config.feedback);
        let rng = config.seed.map_or_else(Rng::from_entropy, Rng::new);
        let session = Session::with_rng(rng).stack_depth(config.stack_depth.clone());
        let bugs = match &config.output_dir {
            Some(dir) => BugStore::with_log(
                dir.join(format!("{}_discrepancies.jsonl", target.name())),
                config.discrepancy_cap,
            )?,
            None => BugStore::new(config.discrepancy_cap),
        };
        Ok(Self {
            strategy: config.feedback.strategy(),
            target,
            config,
            scheduler,
            feedback: Arc::new(FeedbackOracle::new()),
            signal,
            oracle,
            bugs,
            session,
            stop: StopToken::new(),
            abandoned: Vec::new(),
            stats: Stats::default(),
        })
    }

    /// Use `feedback` instead of a fresh feedback oracle.
    pub fn with_feedback(mut self, feedback: Arc<FeedbackOracle>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Record discrepancies into `bugs`.
    pub fn with_bug_store(mut self, bugs: BugStore) -> Self {
        self.bugs = bugs;
        self
    }

    /// Stop when `stop` is triggered.
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// The token that stops this fuzzer.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// The target under test.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The feedback oracle.
    pub fn feedback(&self) -> &Arc<FeedbackOracle> {
        &self.feedback
    }

    /// The discrepancies recorded so far.
    pub fn bugs(&self) -> &BugStore {
        &self.bugs
    }

    /// The corpus.
    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.scheduler
    }

    /// Admit `seeds` and fuzz until stopped.
    ///
    /// Every seed is run through the feedback oracle once before the loop
    /// starts, so that mutants are judged against what the seeds already
    /// cover. An empty seed list is a [`Config`][crate::ErrorKind::Config]
    /// error.
    ///
    /// Failures of the corpus or of artifact I/O during the run are logged and
    /// counted as infrastructure errors, and the loop carries on. Only a
    /// [`CorruptArtifact`][crate::ErrorKind::CorruptArtifact] error stops the
    /// run early; it is returned after the run has been finalized, so the
    /// summary is still logged and artifacts are still saved.
    pub fn run(&mut self, seeds: Vec<Graph>) -> Result<Summary> {
        if seeds.is_empty() {
            return Err(Error::config("no seed graphs to start from"));
        }
        let start = Instant::now();
        log::info!(
            "fuzzing `{}` with {} testing and {} feedback from {} seeds",
            self.target.name(),
            self.config.method,
            self.config.feedback,
            seeds.len()
        );

        log::info!("Performing initial feedback checks...");
        for (i, seed) in seeds.iter().enumerate() {
            if self.feedback.is_interesting(self.strategy, seed, &self.signal) {
                log::debug!("initial feedback check passed for seed {}", i + 1);
            }
        }
        let mut fatal = self.admit_seeds(seeds).err();

        let mut failed_selections = 0;
        while fatal.is_none() && !self.stop.is_stopped() {
            if let Some(max) = self.config.max_rounds {
                if self.stats.rounds >= max {
                    break;
                }
            }
            self.stats.rounds += 1;
            let mut current = match self.scheduler.get_graph(self.session.rng()) {
                Ok(graph) => graph,
                Err(e) if e.is_empty_corpus() => {
                    log::error!("the corpus is empty, nothing left to fuzz");
                    break;
                }
                Err(e) => {
                    fatal = self.tolerate("cannot select a graph from the corpus", e).err();
                    failed_selections += 1;
                    if failed_selections >= MAX_FAILED_SELECTIONS {
                        log::error!(
                            "giving up after {failed_selections} failed seed selections in a row"
                        );
                        break;
                    }
                    continue;
                }
            };
            failed_selections = 0;
            for _ in 0..self.config.iterations {
                if self.stop.is_stopped() {
                    break;
                }
                match self.iteration(current, start) {
                    Ok(next) => current = next,
                    Err(e) => {
                        fatal = Some(e);
                        break;
                    }
                }
            }
        }

        let summary = self.finalize(start);
        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    fn admit_seeds(&mut self, seeds: Vec<Graph>) -> Result<()> {
        for seed in seeds {
            if let Err(e) = self.scheduler.add(seed) {
                self.tolerate("cannot admit a seed to the corpus", e)?;
            }
        }
        Ok(())
    }

    /// Log and count an infrastructure error, unless it must end the run.
    fn tolerate(&mut self, context: &str, error: Error) -> Result<()> {
        if error.is_corrupt_artifact() {
            log::error!("{context}: {error}");
            return Err(error);
        }
        self.stats.infrastructure_errors += 1;
        log::warn!("{context}: {error}");
        Ok(())
    }

    /// Mutate, test and judge one graph. Returns the graph to continue from.
    ///
    /// Errors are only returned when the run has to stop.
    fn iteration(&mut self, current: Graph, start: Instant) -> Result<Graph> {
        let mut mutated = current.clone();
        let mut mutator = GraphMutator::new()
            .operators(self.config.operators.iter().copied())
            .with_corpus(&mut *self.scheduler);
        match self.session.stacked_mutate_with(&mut mutator, &mut mutated) {
            Ok(_) => {}
            // Every enabled operator is inapplicable to this graph.
            Err(e) if e.is_exhausted() => {
                log::trace!("no mutation applies to {current}");
                return Ok(current);
            }
            Err(e) => {
                self.tolerate("mutation failed", e)?;
                return Ok(current);
            }
        }
        self.stats.executions += 1;

        match self.run_oracle(&mutated) {
            OracleRun::Completed(found) => {
                for discrepancy in found {
                    if let Err(e) = self.bugs.record(discrepancy, start.elapsed()) {
                        self.tolerate("cannot record a discrepancy", e)?;
                    }
                }
                if self.feedback.is_interesting(self.strategy, &mutated, &self.signal) {
                    log::debug!("admitting {mutated} to the corpus");
                    match self.scheduler.add(mutated.clone()) {
                        Ok(()) => return Ok(mutated),
                        Err(e) => self.tolerate("cannot admit a graph to the corpus", e)?,
                    }
                }
            }
            OracleRun::TimedOut => {
                self.stats.timeouts += 1;
                let message = format!(
                    "Timeout Error: Exceeded {} seconds.",
                    self.config.timeout.as_secs_f64()
                );
                if self.feedback.record_exception(&mutated, message.as_str()) {
                    log::warn!("{message}");
                }
            }
            OracleRun::Crashed(reason) => {
                self.stats.infrastructure_errors += 1;
                log::error!("oracle worker died: {reason}");
            }
        }
        Ok(current)
    }

    /// Run the test oracle on a worker thread, waiting at most the configured
    /// timeout for it.
    fn run_oracle(&mut self, graph: &Graph) -> OracleRun {
        self.abandoned.retain(|worker| !worker.is_finished());

        let (tx, rx) = mpsc::channel();
        let oracle = Arc::clone(&self.oracle);
        let input = graph.clone();
        let mut rng = self.session.rng().fork();
        let spawned = thread::Builder::new()
            .name(format!("{}-oracle", self.target.name()))
            .spawn(move || {
                let found = oracle.test(&input, &mut rng);
                // Nobody is listening after a timeout.
                let _ = tx.send(found);
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => return OracleRun::Crashed(format!("cannot spawn a worker: {e}")),
        };

        match rx.recv_timeout(self.config.timeout) {
            Ok(found) => {
                let _ = worker.join();
                OracleRun::Completed(found)
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!(
                    "abandoning a worker after {:?} on {graph}",
                    self.config.timeout
                );
                self.abandoned.push(worker);
                OracleRun::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => OracleRun::Crashed(match worker.join() {
                Err(payload) => panic_message(&*payload),
                Ok(()) => "the worker exited without a result".to_string(),
            }),
        }
    }

    fn finalize(&mut self, start: Instant) -> Summary {
        log::info!("Finalizing process...");
        self.abandoned.retain(|worker| !worker.is_finished());
        let summary = Summary {
            target: self.target.name().to_string(),
            feedback: self.config.feedback,
            executions: self.stats.executions,
            rounds: self.stats.rounds,
            corpus_size: self.scheduler.len(),
            elapsed: start.elapsed(),
            timeouts: self.stats.timeouts,
            abandoned_workers: self.abandoned.len(),
            infrastructure_errors: self.stats.infrastructure_errors,
            discrepancies: self.bugs.counts().clone(),
            first_seen: self.bugs.first_seen().clone(),
            exceptions: self.feedback.exceptions(),
        };
        log::info!("{summary}");

        if let Some(dir) = self.config.output_dir.clone() {
            if let Err(e) = self.save_artifacts(&dir) {
                log::error!("failed to save artifacts to {}: {e}", dir.display());
            }
        }
        summary
    }

    fn save_artifacts(&mut self, dir: &Path) -> Result<()> {
        let name = self.target.name();
        let exceptions = self.feedback.exception_graphs();
        if !exceptions.is_empty() {
            persist::save_exceptions(&dir.join(format!("{name}_exceptions.json")), &exceptions)?;
        }
        let corpus = self.scheduler.snapshot()?;
        persist::save_corpus(&dir.join(format!("{name}_corpus.json")), &corpus)
    }
}
