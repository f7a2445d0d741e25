use graphfuzz::feedback::{FeedbackKind, FeedbackOracle, Signal, Strategy};
use graphfuzz::fingerprint::{DefaultReducer, Fingerprint};
use graphfuzz::{probe, targets, ExecError, Graph, NodeId, Output};

fn with_nodes(n: u32) -> Graph {
    let mut g = Graph::new(false, false);
    for i in 0..n {
        g.add_node(i);
    }
    g
}

/// Reports the node count, or fails on graphs with an even number of edges
/// greater than zero.
fn node_count(g: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    if g.edge_count() > 0 && g.edge_count() % 2 == 0 {
        return Err(ExecError::algorithm("even edge count"));
    }
    Ok(Output::Number(g.node_count() as f64))
}

fn branchy(g: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    if g.node_count() > 3 {
        probe!();
        if g.edge_count() > 0 {
            probe!();
        }
    } else {
        probe!();
    }
    probe!();
    Ok(Output::Number(0.0))
}

#[test]
fn repeated_fingerprint_is_not_new() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(node_count, DefaultReducer);
    assert!(oracle.is_interesting(Strategy::Novelty, &with_nodes(5), &signal));
    assert!(!oracle.is_interesting(Strategy::Novelty, &with_nodes(5), &signal));
    Ok(())
}

#[test]
fn different_fingerprint_is_new() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(node_count, DefaultReducer);
    assert!(oracle.is_interesting(Strategy::Novelty, &with_nodes(5), &signal));
    assert!(oracle.is_interesting(Strategy::Novelty, &with_nodes(7), &signal));
    assert_eq!(oracle.observed_output_count(), 2);
    Ok(())
}

#[test]
fn custom_reducers_coarsen_novelty() -> anyhow::Result<()> {
    let parity = |o: &Output| Fingerprint::from(o.as_number().unwrap_or(0.0) as i64 % 2);
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(node_count, parity);
    assert!(oracle.is_new_output(&with_nodes(1), &signal));
    assert!(oracle.is_new_output(&with_nodes(2), &signal));
    assert!(!oracle.is_new_output(&with_nodes(3), &signal));
    assert!(!oracle.is_new_output(&with_nodes(10), &signal));
    Ok(())
}

#[test]
fn first_failure_is_new_and_logged() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(node_count, DefaultReducer);

    let mut g = with_nodes(3);
    g.add_edge(0, 1, None);
    g.add_edge(1, 2, None);
    assert!(oracle.is_new_output(&g, &signal));
    g.add_node(9);
    assert!(!oracle.is_new_output(&g, &signal));

    assert_eq!(oracle.exceptions(), vec!["Algorithm Error: even edge count".to_string()]);
    let logged = oracle.exception_graphs();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0.node_count(), 3);
    Ok(())
}

#[test]
fn recorded_exceptions_are_deduplicated() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let message = "Timeout Error: Exceeded 20 seconds.";
    assert!(oracle.record_exception(&with_nodes(1), message));
    assert!(!oracle.record_exception(&with_nodes(2), message));
    assert_eq!(oracle.exceptions(), vec![message.to_string()]);
    Ok(())
}

#[test]
fn line_coverage_tracks_probes() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(branchy, DefaultReducer);

    assert!(oracle.is_new_line_coverage(&with_nodes(1), &signal));
    assert_eq!(oracle.observed_line_count(), 2);
    assert!(!oracle.is_new_line_coverage(&with_nodes(2), &signal));
    assert!(oracle.is_new_line_coverage(&with_nodes(5), &signal));
    assert_eq!(oracle.observed_line_count(), 3);

    let mut g = with_nodes(5);
    g.add_edge(0, 1, None);
    assert!(oracle.is_new_line_coverage(&g, &signal));
    assert_eq!(oracle.observed_line_count(), 4);
    assert!(!oracle.is_new_line_coverage(&g, &signal));
    Ok(())
}

#[test]
fn branch_coverage_tracks_transitions() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(branchy, DefaultReducer);

    assert!(oracle.is_interesting(Strategy::BranchCoverage, &with_nodes(1), &signal));
    assert_eq!(oracle.observed_branch_count(), 1);
    assert!(oracle.is_interesting(Strategy::BranchCoverage, &with_nodes(4), &signal));
    assert!(!oracle.is_interesting(Strategy::BranchCoverage, &with_nodes(6), &signal));
    Ok(())
}

#[test]
fn disabled_feedback_admits_nothing() -> anyhow::Result<()> {
    let oracle = FeedbackOracle::new();
    let signal = Signal::new(node_count, DefaultReducer);
    for n in 0..5 {
        assert!(!oracle.is_interesting(FeedbackKind::None.strategy(), &with_nodes(n), &signal));
    }
    assert_eq!(oracle.observed_output_count(), 0);
    Ok(())
}

#[test]
fn feedback_kinds_parse_by_name() -> anyhow::Result<()> {
    for kind in FeedbackKind::ALL {
        assert_eq!(kind.name().parse::<FeedbackKind>()?, kind);
    }
    assert!("novelty".parse::<FeedbackKind>().unwrap_err().is_config());
    assert_eq!(FeedbackKind::Combination.strategy(), Strategy::Combination);
    assert!(FeedbackKind::HopCount.is_specialized());
    assert!(!FeedbackKind::Branch.is_specialized());
    Ok(())
}

#[test]
fn specialized_kinds_follow_their_target() -> anyhow::Result<()> {
    let shortest_path = targets::by_name("shortest_path")?;
    let kinds = shortest_path.feedback_kinds();
    assert!(kinds.contains(&FeedbackKind::HopCount));
    assert!(kinds.contains(&FeedbackKind::NegativeEdges));
    assert!(!kinds.contains(&FeedbackKind::MaxDegree));
    assert!(kinds.contains(&FeedbackKind::Regular));

    // Hop counts of a three-node path from the highest-degree node.
    let oracle = FeedbackOracle::new();
    let signal = shortest_path.signal_for(FeedbackKind::HopCount);
    let mut g = Graph::new(true, false);
    g.add_edge(0, 1, Some(1.0));
    g.add_edge(1, 2, Some(1.0));
    assert!(oracle.is_new_output(&g, &signal));
    assert!(!oracle.is_new_output(&g, &signal));

    // Unsupported kinds fall back to the default signal.
    let fallback = shortest_path.signal_for(FeedbackKind::MaxDegree);
    assert!(FeedbackOracle::new().is_new_output(&g, &fallback));
    Ok(())
}
