use super::Scheduler;
use crate::{Error, Graph, Result, Rng};
use std::time::SystemTime;

/// A retained graph.
#[derive(Clone, Debug)]
pub struct CorpusEntry {
    /// Insertion order, starting at zero.
    pub id: u64,
    /// When the graph was admitted.
    pub inserted_at: SystemTime,
    /// The graph itself.
    pub graph: Graph,
}

/// An in-memory corpus with uniform random selection.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::{scheduler::{MemScheduler, Scheduler}, Graph, Rng};
///
/// let mut corpus = MemScheduler::new();
/// assert!(corpus.get_graph(&mut Rng::new(0)).unwrap_err().is_empty_corpus());
///
/// corpus.add(Graph::new(true, false))?;
/// assert_eq!(corpus.len(), 1);
/// let _copy = corpus.get_graph(&mut Rng::new(0))?;
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemScheduler {
    entries: Vec<CorpusEntry>,
}

impl MemScheduler {
    /// An empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained entries, in insertion order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }
}

impl Scheduler for MemScheduler {
    fn add(&mut self, graph: Graph) -> Result<()> {
        let id = self.entries.len() as u64;
        self.entries.push(CorpusEntry {
            id,
            inserted_at: SystemTime::now(),
            graph,
        });
        Ok(())
    }

    fn get_graph(&mut self, rng: &mut Rng) -> Result<Graph> {
        rng.choose(self.entries.iter())
            .map(|e| e.graph.clone())
            .ok_or_else(Error::empty_corpus)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn snapshot(&mut self) -> Result<Vec<Graph>> {
        Ok(self.entries.iter().map(|e| e.graph.clone()).collect())
    }
}
