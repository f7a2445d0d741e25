use super::{Fuzzer, StopToken, Summary};
use crate::config::FuzzConfig;
use crate::coverage::{self, ProbeTracer, SharedInstrumentation};
use crate::feedback::{FeedbackKind, FeedbackOracle};
use crate::scheduler::MemScheduler;
use crate::targets::Target;
use crate::{Error, Graph, Result};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Several fuzzers over one target, one per feedback kind, run side by side.
///
/// Every fuzzer gets its own in-memory corpus and feedback state, while
/// coverage is measured through a single shared instrumentation. All of them
/// stop together, when the shared [`StopToken`] is triggered or the time
/// limit passes.
///
/// Artifacts of each fuzzer go to a subdirectory of the configured output
/// directory named after its feedback kind.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::config::FuzzConfig;
/// use graphfuzz::feedback::FeedbackKind;
/// use graphfuzz::fuzzer::Campaign;
/// use graphfuzz::{seeds, targets};
///
/// let target = targets::by_name("scc")?;
/// let seeds = vec![seeds::single_node(&target)];
/// let config = FuzzConfig::new().iterations(3).max_rounds(2).seed(9);
///
/// let results = Campaign::new(target, config)
///     .feedbacks([FeedbackKind::None, FeedbackKind::Regular])
///     .run(seeds)?;
/// assert_eq!(results.len(), 2);
/// for (kind, summary) in results {
///     println!("{kind}: {}", summary?.executions);
/// }
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
pub struct Campaign {
    target: Target,
    config: FuzzConfig,
    kinds: Vec<FeedbackKind>,
    time_limit: Option<Duration>,
    stop: StopToken,
    instrumentation: SharedInstrumentation,
}

impl fmt::Debug for Campaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Campaign")
            .field("target", &self.target.name())
            .field("config", &self.config)
            .field("kinds", &self.kinds)
            .field("time_limit", &self.time_limit)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

impl Campaign {
    /// A campaign over `target` with every feedback kind it supports.
    pub fn new(target: Target, config: FuzzConfig) -> Self {
        Self {
            kinds: target.feedback_kinds(),
            target,
            config,
            time_limit: None,
            stop: StopToken::new(),
            instrumentation: coverage::shared(ProbeTracer::new()),
        }
    }

    /// Run exactly these feedback kinds.
    pub fn feedbacks(mut self, kinds: impl IntoIterator<Item = FeedbackKind>) -> Self {
        self.kinds.clear();
        for kind in kinds {
            if !self.kinds.contains(&kind) {
                self.kinds.push(kind);
            }
        }
        self
    }

    /// Stop every fuzzer after `limit`.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Stop every fuzzer when `stop` is triggered.
    pub fn stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    fn config_for(&self, index: usize, kind: FeedbackKind) -> FuzzConfig {
        let mut config = self.config.clone().feedback(kind);
        config.seed = config.seed.map(|seed| seed.wrapping_add(index as u64));
        config.output_dir = config.output_dir.map(|dir| dir.join(kind.name()));
        config
    }

    /// Run every fuzzer from the same `seeds` and collect their results in
    /// the order the feedback kinds were given.
    ///
    /// A fuzzer that fails or panics does not stop the others; its entry
    /// holds the error and every other entry still holds its summary. The
    /// outer error is for campaigns that could not be started at all.
    pub fn run(self, seeds: Vec<Graph>) -> Result<Vec<(FeedbackKind, Result<Summary>)>> {
        if self.kinds.is_empty() {
            return Err(Error::config("a campaign needs at least one feedback kind"));
        }
        self.config.validate()?;
        self.target.oracle(&self.config.method, self.config.metamorphic_attempts)?;

        let mut fuzzers = Vec::with_capacity(self.kinds.len());
        for (i, &kind) in self.kinds.iter().enumerate() {
            let feedback = Arc::new(FeedbackOracle::with_instrumentation(Arc::clone(
                &self.instrumentation,
            )));
            let fuzzer = Fuzzer::new(
                self.target.clone(),
                self.config_for(i, kind),
                Box::new(MemScheduler::new()),
            )
            .map(|fuzzer| fuzzer.with_feedback(feedback).with_stop_token(self.stop.clone()));
            if let Err(e) = &fuzzer {
                log::error!("cannot start the {kind} fuzzer: {e}");
            }
            fuzzers.push((kind, fuzzer));
        }
        log::info!(
            "starting a campaign on `{}` with {} feedback kinds",
            self.target.name(),
            fuzzers.len()
        );

        let start = Instant::now();
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(fuzzers.len());
            for (kind, fuzzer) in fuzzers {
                let mut fuzzer = match fuzzer {
                    Ok(fuzzer) => fuzzer,
                    Err(e) => {
                        handles.push((kind, Err(e)));
                        continue;
                    }
                };
                let seeds = seeds.clone();
                let spawned = thread::Builder::new()
                    .name(format!("fuzz-{kind}"))
                    .spawn_scoped(scope, move || fuzzer.run(seeds));
                match spawned {
                    Ok(handle) => handles.push((kind, Ok(handle))),
                    Err(e) => {
                        // The scope joins the fuzzers already running.
                        self.stop.stop();
                        return Err(Error::from(e));
                    }
                }
            }

            if let Some(limit) = self.time_limit {
                while !self.stop.is_stopped()
                    && !handles
                        .iter()
                        .all(|(_, h)| h.as_ref().map_or(true, |h| h.is_finished()))
                {
                    if start.elapsed() >= limit {
                        log::info!("campaign time limit of {limit:?} reached");
                        self.stop.stop();
                        break;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }

            let results = handles
                .into_iter()
                .map(|(kind, handle)| {
                    let result = handle.and_then(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(Error::other(format!("the {kind} fuzzer panicked")))
                        })
                    });
                    if let Err(e) = &result {
                        log::error!("the {kind} fuzzer failed: {e}");
                    }
                    (kind, result)
                })
                .collect();
            Ok(results)
        })
    }
}
