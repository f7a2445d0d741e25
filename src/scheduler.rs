//! The corpus of retained graphs and the policy for picking the next seed.
//!
//! Both provided schedulers pick uniformly at random among retained entries.
//! [`MemScheduler`] keeps graphs in memory; [`DiskScheduler`] keeps one JSON
//! file per graph in a folder and resumes from whatever is already there.

use crate::{Error, Graph, Result, Rng};
use std::path::Path;
use std::str::FromStr;

mod disk;
mod mem;

pub use disk::DiskScheduler;
pub use mem::{CorpusEntry, MemScheduler};

/// A corpus of graphs that the fuzz loop draws seeds from and admits
/// interesting graphs into.
pub trait Scheduler: Send {
    /// Admit a single graph.
    fn add(&mut self, graph: Graph) -> Result<()>;

    /// Admit every graph in `graphs`.
    fn add_to_corpus(&mut self, graphs: Vec<Graph>) -> Result<()> {
        for graph in graphs {
            self.add(graph)?;
        }
        Ok(())
    }

    /// Pick a retained graph and return an owned copy of it.
    ///
    /// Returns an [`EmptyCorpus`][crate::ErrorKind::EmptyCorpus] error when
    /// nothing is retained.
    fn get_graph(&mut self, rng: &mut Rng) -> Result<Graph>;

    /// Number of retained graphs.
    fn len(&self) -> usize;

    /// Whether no graph is retained.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of every retained graph, in insertion order.
    fn snapshot(&mut self) -> Result<Vec<Graph>>;
}

/// Which [`Scheduler`] implementation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerKind {
    /// [`MemScheduler`].
    #[default]
    Mem,
    /// [`DiskScheduler`].
    Disk,
}

impl FromStr for SchedulerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mem" => Ok(SchedulerKind::Mem),
            "disk" => Ok(SchedulerKind::Disk),
            _ => Err(Error::config(format!(
                "unknown scheduler `{s}`, expected `mem` or `disk`"
            ))),
        }
    }
}

impl SchedulerKind {
    /// Construct a scheduler of this kind. `folder` is only used by
    /// [`SchedulerKind::Disk`].
    pub fn open(self, folder: &Path) -> Result<Box<dyn Scheduler>> {
        Ok(match self {
            SchedulerKind::Mem => Box::new(MemScheduler::new()),
            SchedulerKind::Disk => Box::new(DiskScheduler::open(folder)?),
        })
    }
}
