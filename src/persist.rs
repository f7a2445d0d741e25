//! On-disk artifacts: corpus snapshots and the exception log.
//!
//! Everything is JSON. Files are written to a temporary sibling and then
//! renamed over the destination, so an interrupted run never leaves a
//! half-written artifact behind.

use crate::{Error, Graph, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Write `bytes` to `path` via a temporary file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

/// Whether `path` names a temporary file left behind by [`write_atomic`].
pub(crate) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(".tmp"))
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Read and deserialize a JSON file.
///
/// A file that exists but does not parse is reported as
/// [`CorruptArtifact`][crate::ErrorKind::CorruptArtifact].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::corrupt_artifact(path, e.to_string()))
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// A saved corpus.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    /// When the snapshot was taken, in Unix milliseconds.
    pub saved_at: u64,
    /// The retained graphs.
    pub graphs: Vec<Graph>,
}

/// Save `graphs` as a corpus snapshot.
pub fn save_corpus(path: &Path, graphs: &[Graph]) -> Result<()> {
    let snapshot = CorpusSnapshot {
        saved_at: unix_millis(SystemTime::now()),
        graphs: graphs.to_vec(),
    };
    save_json(path, &snapshot)?;
    log::info!("saved {} graphs to {}", graphs.len(), path.display());
    Ok(())
}

/// Load a corpus snapshot.
///
/// A missing, empty or corrupted snapshot yields an empty corpus and a
/// warning rather than an error: the fuzzer simply starts fresh.
pub fn load_corpus(path: &Path) -> Vec<Graph> {
    match fs::metadata(path) {
        Err(_) => {
            log::warn!("no corpus at {}, starting fresh", path.display());
            return Vec::new();
        }
        Ok(meta) if meta.len() == 0 => {
            log::warn!("corpus {} is empty, starting fresh", path.display());
            return Vec::new();
        }
        Ok(_) => {}
    }
    match load_json::<CorpusSnapshot>(path) {
        Ok(snapshot) => {
            log::info!("loaded {} graphs from {}", snapshot.graphs.len(), path.display());
            snapshot.graphs
        }
        Err(e) => {
            log::warn!("{e}; starting with a fresh corpus");
            Vec::new()
        }
    }
}

/// A graph that made an executor fail, with the failure message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// The failure message, including its category prefix.
    pub message: String,
    /// The input that triggered it.
    pub graph: Graph,
}

/// Save the exception-graph log.
pub fn save_exceptions(path: &Path, exceptions: &[(Graph, String)]) -> Result<()> {
    let records: Vec<ExceptionRecord> = exceptions
        .iter()
        .map(|(graph, message)| ExceptionRecord {
            message: message.clone(),
            graph: graph.clone(),
        })
        .collect();
    save_json(path, &records)?;
    log::info!("saved {} exception graphs to {}", records.len(), path.display());
    Ok(())
}
