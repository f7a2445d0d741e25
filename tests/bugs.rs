use graphfuzz::bugs::{BugStore, DiscrepancyRecord};
use graphfuzz::oracle::Discrepancy;
use graphfuzz::Graph;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("graphfuzz-bugs-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn discrepancy(message: &str, nodes: u32) -> Discrepancy {
    let mut graph = Graph::new(true, false);
    for n in 0..nodes {
        graph.add_node(n);
    }
    Discrepancy {
        message: message.to_string(),
        graph,
        args: vec![],
        mutated: None,
    }
}

#[test]
fn cap_bounds_examples_but_not_counts() -> anyhow::Result<()> {
    let mut bugs = BugStore::new(100);
    for i in 0..150 {
        let first = bugs.record(discrepancy("a and b differ", i % 5), Duration::from_millis(i.into()))?;
        assert_eq!(first, i == 0);
    }
    assert_eq!(bugs.examples().len(), 100);
    assert_eq!(bugs.count("a and b differ"), 150);
    assert_eq!(bugs.retained("a and b differ"), 100);
    assert_eq!(bugs.first_seen()["a and b differ"], Duration::ZERO);
    Ok(())
}

#[test]
fn messages_are_counted_separately() -> anyhow::Result<()> {
    let mut bugs = BugStore::new(2);
    assert!(bugs.record(discrepancy("first", 1), Duration::from_secs(1))?);
    assert!(bugs.record(discrepancy("second", 1), Duration::from_secs(2))?);
    assert!(!bugs.record(discrepancy("first", 2), Duration::from_secs(3))?);

    assert_eq!(bugs.count("first"), 2);
    assert_eq!(bugs.count("second"), 1);
    assert_eq!(bugs.count("third"), 0);
    assert_eq!(bugs.total(), 3);
    assert_eq!(bugs.first_seen()["second"], Duration::from_secs(2));
    Ok(())
}

#[test]
fn log_cap_holds_across_reopen() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let path = dir.join("scc_discrepancies.jsonl");

    let mut bugs = BugStore::with_log(&path, 3)?;
    for _ in 0..2 {
        bugs.record(discrepancy("tarjan and kosaraju differ", 2), Duration::ZERO)?;
    }
    assert!(bugs.examples().is_empty());
    drop(bugs);

    let mut bugs = BugStore::with_log(&path, 3)?;
    assert_eq!(bugs.retained("tarjan and kosaraju differ"), 2);
    for _ in 0..5 {
        bugs.record(discrepancy("tarjan and kosaraju differ", 2), Duration::ZERO)?;
    }
    assert_eq!(bugs.retained("tarjan and kosaraju differ"), 3);
    assert_eq!(bugs.count("tarjan and kosaraju differ"), 5);
    drop(bugs);

    let contents = fs::read_to_string(&path)?;
    let records = contents
        .lines()
        .map(serde_json::from_str::<DiscrepancyRecord>)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.graph.node_count() == 2));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn torn_final_line_is_dropped() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let path = dir.join("mst_discrepancies.jsonl");

    let mut bugs = BugStore::with_log(&path, 10)?;
    bugs.record(discrepancy("kruskal and prim differ", 1), Duration::ZERO)?;
    drop(bugs);
    let mut contents = fs::read_to_string(&path)?;
    contents.push_str("{\"message\":\"kruskal an");
    fs::write(&path, contents)?;

    let mut bugs = BugStore::with_log(&path, 10)?;
    assert_eq!(bugs.retained("kruskal and prim differ"), 1);
    bugs.record(discrepancy("kruskal and prim differ", 3), Duration::ZERO)?;
    drop(bugs);

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), 2);
    for line in contents.lines() {
        serde_json::from_str::<DiscrepancyRecord>(line)?;
    }

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn corrupt_interior_is_an_error() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let path = dir.join("max_flow_discrepancies.jsonl");

    let mut bugs = BugStore::with_log(&path, 10)?;
    bugs.record(discrepancy("dinic and edmonds_karp differ", 1), Duration::ZERO)?;
    drop(bugs);
    let good = fs::read_to_string(&path)?;
    fs::write(&path, format!("not a record\n{good}"))?;

    let err = BugStore::with_log(&path, 10).unwrap_err();
    assert!(err.is_corrupt_artifact());
    // The damaged log is left alone.
    assert!(fs::read_to_string(&path)?.starts_with("not a record"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn failed_appends_do_not_count_towards_the_cap() -> anyhow::Result<()> {
    // Every write to `/dev/full` fails with "no space left on device".
    let mut bugs = BugStore::with_log("/dev/full", 2)?;
    let d = discrepancy("prim and kruskal differ", 3);

    assert!(bugs.record(d.clone(), Duration::ZERO).is_err());
    assert!(bugs.record(d.clone(), Duration::ZERO).is_err());
    assert_eq!(bugs.retained("prim and kruskal differ"), 0);
    assert_eq!(bugs.count("prim and kruskal differ"), 2);
    assert!(bugs.first_seen().contains_key("prim and kruskal differ"));
    Ok(())
}
