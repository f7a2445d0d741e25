use graphfuzz::persist;
use graphfuzz::scheduler::{DiskScheduler, MemScheduler, Scheduler, SchedulerKind};
use graphfuzz::{seeds, targets, Graph, Rng};
use std::fs;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("graphfuzz-corpus-{}", uuid::Uuid::new_v4()))
}

/// The corpus entry files in `dir`, oldest first.
fn entry_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let path = dirent?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with("graph-") && name.ends_with(".json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn path_graph(len: u32) -> Graph {
    let mut g = Graph::new(false, false);
    g.add_node(0);
    for n in 1..len {
        g.add_edge(n - 1, n, Some(n as f64));
    }
    g
}

#[test]
fn every_admitted_graph_is_reachable() -> anyhow::Result<()> {
    let mut corpus = MemScheduler::new();
    let graphs: Vec<Graph> = (1..=4).map(path_graph).collect();
    corpus.add_to_corpus(graphs.clone())?;

    let mut rng = Rng::new(5);
    let mut seen = vec![false; graphs.len()];
    for _ in 0..200 {
        let g = corpus.get_graph(&mut rng)?;
        let i = graphs.iter().position(|h| *h == g).expect("a retained graph");
        seen[i] = true;
    }
    assert!(seen.iter().all(|&s| s));
    assert_eq!(corpus.snapshot()?, graphs);
    Ok(())
}

#[test]
fn disk_corpus_resumes() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let graphs: Vec<Graph> = (1..=3).map(path_graph).collect();

    let mut corpus = DiskScheduler::open(&dir)?;
    assert!(corpus.is_empty());
    corpus.add_to_corpus(graphs.clone())?;
    drop(corpus);

    let mut corpus = SchedulerKind::Disk.open(&dir)?;
    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus.snapshot()?, graphs);

    corpus.add(path_graph(7))?;
    drop(corpus);
    let mut corpus = DiskScheduler::open(&dir)?;
    assert_eq!(corpus.len(), 4);
    assert_eq!(corpus.snapshot()?.last(), Some(&path_graph(7)));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn corrupt_disk_entry_is_skipped() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let mut corpus = DiskScheduler::open(&dir)?;
    corpus.add(path_graph(2))?;
    corpus.add(path_graph(3))?;
    drop(corpus);

    let damaged = entry_files(&dir)?.remove(0);
    fs::write(&damaged, b"{ not json")?;

    let mut corpus = DiskScheduler::open(&dir)?;
    assert_eq!(corpus.len(), 2);
    let mut rng = Rng::new(0);
    for _ in 0..20 {
        assert_eq!(corpus.get_graph(&mut rng)?, path_graph(3));
    }
    assert_eq!(corpus.snapshot()?, vec![path_graph(3)]);
    assert_eq!(corpus.len(), 1);
    // The damaged file is kept for inspection.
    assert!(damaged.exists());

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn disk_corpus_ignores_foreign_files() -> anyhow::Result<()> {
    let dir = scratch_dir();
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("notes.txt"), b"hello")?;
    fs::write(dir.join("seed.json"), b"{}")?;

    let mut corpus = DiskScheduler::open(&dir)?;
    assert!(corpus.is_empty());
    assert!(corpus.get_graph(&mut Rng::new(0)).unwrap_err().is_empty_corpus());

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn snapshots_seed_later_runs() -> anyhow::Result<()> {
    let dir = scratch_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join("components_corpus.json");
    let target = targets::by_name("components")?;

    let saved = vec![path_graph(3), path_graph(5)];
    persist::save_corpus(&path, &saved)?;
    assert_eq!(persist::load_corpus(&path), saved);
    assert_eq!(seeds::initial(&target, Some(&path), false, &mut Rng::new(0)), saved);

    // Graphs of another kind are not usable seeds.
    let directed = seeds::single_node(&targets::by_name("scc")?);
    persist::save_corpus(&path, &[directed])?;
    let fallback = seeds::initial(&target, Some(&path), false, &mut Rng::new(0));
    assert_eq!(fallback, vec![seeds::single_node(&target)]);

    fs::write(&path, b"garbage")?;
    assert!(persist::load_corpus(&path).is_empty());
    let fallback = seeds::initial(&target, Some(&path), true, &mut Rng::new(0));
    assert_eq!(fallback.len(), seeds::RANDOM_GRAPHS);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn processes_can_share_a_disk_corpus() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let mut first = DiskScheduler::open(&dir)?;
    let mut second = DiskScheduler::open(&dir)?;
    first.add(path_graph(2))?;
    second.add(path_graph(3))?;

    // Neither admission replaced the other.
    assert_eq!(entry_files(&dir)?.len(), 2);
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    // Each sees what the other admitted.
    let mut rng = Rng::new(1);
    let picked: BTreeSet<u32> = (0..50)
        .map(|_| first.get_graph(&mut rng).map(|g| g.node_count() as u32))
        .collect::<graphfuzz::Result<_>>()?;
    assert_eq!(picked, BTreeSet::from([2, 3]));

    let mut reopened = DiskScheduler::open(&dir)?;
    assert_eq!(reopened.len(), 2);
    let saved: BTreeSet<usize> = reopened.snapshot()?.iter().map(Graph::node_count).collect();
    assert_eq!(saved, BTreeSet::from([2, 3]));

    fs::remove_dir_all(dir)?;
    Ok(())
}
