//! Deduplicating and retaining discrepancies.
//!
//! Discrepancies are keyed by message. The [`BugStore`] remembers when each
//! message was first seen and how often it occurred, and retains at most a
//! fixed number of example inputs per message. When backed by a discrepancy
//! log (JSON Lines, append-only), examples already in the log count towards
//! that cap, so repeated runs appending to one log never exceed it.

use crate::oracle::Discrepancy;
use crate::{Error, Graph, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek as _, SeekFrom, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The default number of examples retained per distinct message.
pub const DEFAULT_CAP: usize = 100;

/// One retained example, as written to the discrepancy log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyRecord {
    /// The discrepancy message.
    pub message: String,
    /// The input that exposed it.
    pub graph: Graph,
    /// The node arguments used.
    #[serde(default)]
    pub args: Vec<NodeId>,
    /// The transformed input, for metamorphic violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutated: Option<(Graph, Vec<NodeId>)>,
    /// Seconds since the start of the run that found it.
    pub timestamp: f64,
}

#[derive(Debug)]
struct DiscrepancyLog {
    path: PathBuf,
    file: File,
}

impl DiscrepancyLog {
    /// Open `path` for appending and count the records already in it.
    fn open(path: &Path) -> Result<(Self, BTreeMap<String, usize>)> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut counts = BTreeMap::new();
        let mut good_len = 0u64;

        if path.is_file() {
            let reader = BufReader::new(File::open(path)?);
            let mut torn: Option<(usize, String)> = None;
            for (index, line) in reader.split(b'\n').enumerate() {
                let line = line?;
                if let Some((torn_line, msg)) = torn.take() {
                    // Only the final line may be damaged.
                    return Err(Error::corrupt_artifact(
                        path,
                        format!("line {}: {msg}", torn_line + 1),
                    ));
                }
                let text = String::from_utf8_lossy(&line);
                if text.trim().is_empty() {
                    good_len += line.len() as u64 + 1;
                    continue;
                }
                match serde_json::from_str::<DiscrepancyRecord>(&text) {
                    Ok(record) => {
                        *counts.entry(record.message).or_default() += 1;
                        good_len += line.len() as u64 + 1;
                    }
                    Err(e) => torn = Some((index, e.to_string())),
                }
            }
            if let Some((torn_line, msg)) = torn {
                log::warn!(
                    "discarding damaged final record at line {} of {}: {msg}",
                    torn_line + 1,
                    path.display()
                );
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        if good_len < len {
            file.set_len(good_len)?;
        } else if good_len > len && len > 0 {
            // The last good line had no trailing newline.
            file.seek(SeekFrom::End(0))?;
            file.write_all(b"\n")?;
        }
        let existing: usize = counts.values().sum();
        if existing > 0 {
            log::info!(
                "found {existing} existing discrepancy records in {}",
                path.display()
            );
        }
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
            },
            counts,
        ))
    }

    fn append(&mut self, record: &DiscrepancyRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Deduplicated discrepancies of one run.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::bugs::BugStore;
/// use graphfuzz::oracle::Discrepancy;
/// use graphfuzz::Graph;
/// use std::time::Duration;
///
/// let mut bugs = BugStore::new(2);
/// let d = Discrepancy {
///     message: "Results of a and b are different for a graph!".into(),
///     graph: Graph::default(),
///     args: vec![],
///     mutated: None,
/// };
/// assert!(bugs.record(d.clone(), Duration::from_secs(1))?);
/// for _ in 0..4 {
///     assert!(!bugs.record(d.clone(), Duration::from_secs(2))?);
/// }
/// assert_eq!(bugs.count(&d.message), 5);
/// assert_eq!(bugs.retained(&d.message), 2);
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
#[derive(Debug)]
pub struct BugStore {
    cap: usize,
    first_seen: BTreeMap<String, Duration>,
    counts: BTreeMap<String, u64>,
    retained: BTreeMap<String, usize>,
    examples: Vec<DiscrepancyRecord>,
    log: Option<DiscrepancyLog>,
}

impl Default for BugStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl BugStore {
    /// An in-memory store retaining up to `cap` examples per message.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            first_seen: BTreeMap::new(),
            counts: BTreeMap::new(),
            retained: BTreeMap::new(),
            examples: Vec::new(),
            log: None,
        }
    }

    /// A store appending retained examples to the log at `path`.
    ///
    /// Records already in the log count towards the cap. A damaged final
    /// line, as left by an interrupted append, is dropped with a warning; any
    /// other damage is a
    /// [`CorruptArtifact`][crate::ErrorKind::CorruptArtifact] error.
    pub fn with_log(path: impl AsRef<Path>, cap: usize) -> Result<Self> {
        let (log, retained) = DiscrepancyLog::open(path.as_ref())?;
        Ok(Self {
            retained,
            log: Some(log),
            ..Self::new(cap)
        })
    }

    /// The discrepancy log, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|l| l.path.as_path())
    }

    /// Record a discrepancy found `elapsed` after the start of the run.
    ///
    /// Returns `true` when this is the first occurrence of its message.
    pub fn record(&mut self, discrepancy: Discrepancy, elapsed: Duration) -> Result<bool> {
        let message = discrepancy.message;
        let first = !self.first_seen.contains_key(&message);
        if first {
            log::info!(
                "Recorded first occurrence of '{message}' at {:.2} seconds since start.",
                elapsed.as_secs_f64()
            );
            self.first_seen.insert(message.clone(), elapsed);
        }
        *self.counts.entry(message.clone()).or_default() += 1;

        if self.retained(&message) >= self.cap {
            log::trace!("already retained {} examples of '{message}'", self.cap);
            return Ok(first);
        }

        let record = DiscrepancyRecord {
            message: message.clone(),
            graph: discrepancy.graph,
            args: discrepancy.args,
            mutated: discrepancy.mutated,
            timestamp: elapsed.as_secs_f64(),
        };
        match &mut self.log {
            Some(log) => log.append(&record)?,
            None => self.examples.push(record),
        }
        // Only count what actually made it into the log.
        *self.retained.entry(message).or_default() += 1;
        Ok(first)
    }

    /// How many times `message` occurred in this run.
    pub fn count(&self, message: &str) -> u64 {
        self.counts.get(message).copied().unwrap_or(0)
    }

    /// How many examples of `message` are retained, including ones already
    /// in the log before this run.
    pub fn retained(&self, message: &str) -> usize {
        self.retained.get(message).copied().unwrap_or(0)
    }

    /// Occurrence counts per message.
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Time of first occurrence per message.
    pub fn first_seen(&self) -> &BTreeMap<String, Duration> {
        &self.first_seen
    }

    /// Examples retained in memory. Empty when backed by a log.
    pub fn examples(&self) -> &[DiscrepancyRecord] {
        &self.examples
    }

    /// Total number of discrepancies recorded in this run.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}
