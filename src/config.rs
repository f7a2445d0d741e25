//! Configuration of a fuzzing run.

use crate::bugs::DEFAULT_CAP;
use crate::feedback::FeedbackKind;
use crate::mutators::Operator;
use crate::oracle::DEFAULT_ATTEMPTS;
use crate::{Error, Result, DEFAULT_STACK_DEPTH};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// The number of mutation iterations per seed selection by default.
pub const DEFAULT_ITERATIONS: usize = 60;

/// The default per-test time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// How each mutated graph is checked for bugs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TestMethod {
    /// Compare every implementation of the target against each other.
    #[default]
    Differential,
    /// Check one implementation against transformed inputs.
    Metamorphic {
        /// The name of the implementation to check.
        algorithm: String,
    },
}

impl TestMethod {
    /// Parse a method name, with the algorithm required by `metamorphic`.
    ///
    /// ```
    /// use graphfuzz::config::TestMethod;
    ///
    /// assert_eq!(TestMethod::parse("differential", None).unwrap(), TestMethod::Differential);
    /// assert!(TestMethod::parse("metamorphic", None).unwrap_err().is_config());
    /// assert!(TestMethod::parse("metamorphic", Some("")).unwrap_err().is_config());
    /// ```
    pub fn parse(method: &str, algorithm: Option<&str>) -> Result<Self> {
        match (method, algorithm) {
            ("differential", _) => Ok(TestMethod::Differential),
            ("metamorphic", Some(algorithm)) if !algorithm.is_empty() => {
                Ok(TestMethod::Metamorphic {
                    algorithm: algorithm.to_string(),
                })
            }
            ("metamorphic", _) => Err(Error::config(
                "metamorphic testing is chosen, but no algorithm specified",
            )),
            (other, _) => Err(Error::config(format!(
                "unknown test method `{other}`, expected `differential` or `metamorphic`"
            ))),
        }
    }
}

impl fmt::Display for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMethod::Differential => f.write_str("differential"),
            TestMethod::Metamorphic { algorithm } => write!(f, "metamorphic({algorithm})"),
        }
    }
}

/// Where the command line tool writes its log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputSink {
    /// Standard error.
    #[default]
    Console,
    /// A fresh file in the log directory.
    File,
}

impl FromStr for OutputSink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "console" => Ok(OutputSink::Console),
            "file" => Ok(OutputSink::File),
            _ => Err(Error::config(format!(
                "unknown output `{s}`, expected `console` or `file`"
            ))),
        }
    }
}

/// Knobs of one fuzzing run.
///
/// Built with chained setters and checked by [`FuzzConfig::validate`], which
/// [`Fuzzer::new`][crate::Fuzzer::new] calls before anything runs.
///
/// # Example
///
/// ```
/// use graphfuzz::config::FuzzConfig;
/// use graphfuzz::feedback::FeedbackKind;
/// use std::time::Duration;
///
/// let config = FuzzConfig::new()
///     .iterations(10)
///     .feedback(FeedbackKind::Coverage)
///     .timeout(Duration::from_secs(2))
///     .seed(42);
/// assert!(config.validate().is_ok());
///
/// assert!(FuzzConfig::new().iterations(0).validate().unwrap_err().is_config());
/// ```
#[derive(Clone, Debug)]
pub struct FuzzConfig {
    /// Mutation iterations per seed selection.
    pub iterations: usize,
    /// How mutated graphs are judged for retention.
    pub feedback: FeedbackKind,
    /// How mutated graphs are checked for bugs.
    pub method: TestMethod,
    /// Time budget of one oracle run.
    pub timeout: Duration,
    /// Seed of the run's random number generator. Drawn from entropy when
    /// absent.
    pub seed: Option<u64>,
    /// Stop after this many seed selections.
    pub max_rounds: Option<u64>,
    /// How many primitive mutations are stacked per iteration.
    pub stack_depth: RangeInclusive<usize>,
    /// Examples retained per distinct discrepancy message.
    pub discrepancy_cap: usize,
    /// Transformations tried per input by the metamorphic oracle.
    pub metamorphic_attempts: usize,
    /// The mutation operators to draw from.
    pub operators: Vec<Operator>,
    /// Where the discrepancy log, exceptions and corpus snapshot are written.
    pub output_dir: Option<PathBuf>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            feedback: FeedbackKind::default(),
            method: TestMethod::default(),
            timeout: DEFAULT_TIMEOUT,
            seed: None,
            max_rounds: None,
            stack_depth: DEFAULT_STACK_DEPTH,
            discrepancy_cap: DEFAULT_CAP,
            metamorphic_attempts: DEFAULT_ATTEMPTS,
            operators: Operator::ALL.to_vec(),
            output_dir: None,
        }
    }
}

impl FuzzConfig {
    /// The default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iterations per seed selection.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the feedback kind.
    pub fn feedback(mut self, feedback: FeedbackKind) -> Self {
        self.feedback = feedback;
        self
    }

    /// Set the test method.
    pub fn method(mut self, method: TestMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the per-test time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make the run reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Bound the number of seed selections.
    pub fn max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Set the stacked mutation depth.
    pub fn stack_depth(mut self, depth: RangeInclusive<usize>) -> Self {
        self.stack_depth = depth;
        self
    }

    /// Set the examples retained per discrepancy message.
    pub fn discrepancy_cap(mut self, cap: usize) -> Self {
        self.discrepancy_cap = cap;
        self
    }

    /// Set the transformations tried per input by the metamorphic oracle.
    pub fn metamorphic_attempts(mut self, attempts: usize) -> Self {
        self.metamorphic_attempts = attempts;
        self
    }

    /// Restrict the mutation operators.
    pub fn operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }

    /// Persist artifacts under `dir`.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Check that the configuration describes a run that can make progress.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::config("iterations must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be positive"));
        }
        if self.stack_depth.is_empty() || *self.stack_depth.start() == 0 {
            return Err(Error::config(format!(
                "invalid stack depth {:?}, expected a non-empty range starting at 1 or more",
                self.stack_depth
            )));
        }
        if self.operators.is_empty() {
            return Err(Error::config("at least one mutation operator is required"));
        }
        if self.discrepancy_cap == 0 {
            return Err(Error::config("the discrepancy cap must be at least 1"));
        }
        Ok(())
    }
}
