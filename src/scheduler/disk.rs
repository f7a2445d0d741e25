use super::Scheduler;
use crate::persist::{self, unix_millis};
use crate::{Error, Graph, Result, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const PREFIX: &str = "graph-";
const EXTENSION: &str = "json";

#[derive(Serialize, Deserialize)]
struct StoredGraph {
    inserted_at: u64,
    graph: Graph,
}

/// A corpus stored as one JSON file per graph.
///
/// Several processes may share one folder. Entry names embed the insertion
/// time and a random id, so concurrent writers never overwrite each other,
/// and the folder is rescanned before every selection so that graphs other
/// processes admit are picked up.
///
/// Opening a folder that already holds entries resumes from them. Entries
/// that cannot be read back are skipped with a warning and not selected
/// again; the file itself is left for inspection.
#[derive(Debug)]
pub struct DiskScheduler {
    folder: PathBuf,
    entries: Vec<PathBuf>,
    skipped: BTreeSet<PathBuf>,
    admitted: u64,
}

impl DiskScheduler {
    /// Open (creating if necessary) a corpus folder.
    pub fn open(folder: impl AsRef<Path>) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();
        fs::create_dir_all(&folder)?;

        let mut scheduler = Self {
            folder,
            entries: Vec::new(),
            skipped: BTreeSet::new(),
            admitted: 0,
        };
        scheduler.refresh()?;
        scheduler.admitted = scheduler.entries.len() as u64;
        if !scheduler.entries.is_empty() {
            log::info!(
                "resuming disk corpus at {} with {} entries",
                scheduler.folder.display(),
                scheduler.entries.len()
            );
        }
        Ok(scheduler)
    }

    /// The corpus folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// The entry files currently in the folder, oldest first.
    fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for dirent in fs::read_dir(&self.folder)? {
            let path = dirent?.path();
            if is_entry(&path) && !self.skipped.contains(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Pick up entries added or removed by other processes.
    fn refresh(&mut self) -> Result<()> {
        self.entries = self.scan()?;
        Ok(())
    }

    fn skip(&mut self, index: usize, error: &Error) {
        let path = self.entries.remove(index);
        log::warn!("skipping corpus entry {}: {error}", path.display());
        self.skipped.insert(path);
    }

    fn read(path: &Path) -> Result<Graph> {
        let stored: StoredGraph = persist::load_json(path)?;
        Ok(stored.graph)
    }
}

fn is_entry(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PREFIX))
}

impl Scheduler for DiskScheduler {
    fn add(&mut self, graph: Graph) -> Result<()> {
        let inserted_at = unix_millis(SystemTime::now());
        // Zero-padded so that names sort in insertion order.
        let name = format!(
            "{PREFIX}{inserted_at:013}-{:08}-{}.{EXTENSION}",
            self.admitted,
            uuid::Uuid::new_v4().simple()
        );
        let path = self.folder.join(name);
        persist::save_json(&path, &StoredGraph { inserted_at, graph })?;
        self.admitted += 1;
        self.entries.push(path);
        Ok(())
    }

    fn get_graph(&mut self, rng: &mut Rng) -> Result<Graph> {
        if let Err(e) = self.refresh() {
            log::warn!("cannot rescan {}: {e}", self.folder.display());
        }
        loop {
            let Some(i) = rng.gen_index(self.entries.len()) else {
                return Err(Error::empty_corpus());
            };
            match Self::read(&self.entries[i]) {
                Ok(graph) => return Ok(graph),
                Err(e) => self.skip(i, &e),
            }
        }
    }

    fn len(&self) -> usize {
        match self.scan() {
            Ok(paths) => paths.len(),
            Err(e) => {
                log::warn!("cannot rescan {}: {e}", self.folder.display());
                self.entries.len()
            }
        }
    }

    fn snapshot(&mut self) -> Result<Vec<Graph>> {
        self.refresh()?;
        let mut graphs = Vec::with_capacity(self.entries.len());
        let mut i = 0;
        while i < self.entries.len() {
            match Self::read(&self.entries[i]) {
                Ok(graph) => {
                    graphs.push(graph);
                    i += 1;
                }
                Err(e) => self.skip(i, &e),
            }
        }
        Ok(graphs)
    }
}
