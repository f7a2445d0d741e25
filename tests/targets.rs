use graphfuzz::executor::execute;
use graphfuzz::feedback::FeedbackKind;
use graphfuzz::oracle::TestOracle;
use graphfuzz::targets::{self, Target};
use graphfuzz::{seeds, Graph, NodeId, Outcome, Output, Rng};
use std::collections::BTreeSet;

fn directed(edges: &[(NodeId, NodeId, f64)]) -> Graph {
    let mut g = Graph::new(true, false);
    for &(u, v, w) in edges {
        g.add_edge(u, v, Some(w));
    }
    g
}

fn undirected(edges: &[(NodeId, NodeId, f64)]) -> Graph {
    let mut g = Graph::new(false, false);
    for &(u, v, w) in edges {
        g.add_edge(u, v, Some(w));
    }
    g
}

/// Run every implementation of `target` that accepts `graph`.
fn outcomes(target: &Target, graph: &Graph, args: &[NodeId]) -> Vec<(String, Outcome)> {
    target
        .implementations()
        .iter()
        .filter(|imp| imp.accepts(graph))
        .map(|imp| (imp.name.clone(), execute(&*imp.executor, graph, args)))
        .collect()
}

fn assert_all_numbers(target: &Target, graph: &Graph, args: &[NodeId], expected: f64) {
    for (name, outcome) in outcomes(target, graph, args) {
        match outcome {
            Outcome::Ok(Output::Number(x)) => {
                assert!((x - expected).abs() < 1e-9, "{name}: {x} != {expected}")
            }
            other => panic!("{name}: unexpected {other:?}"),
        }
    }
}

#[test]
fn names_and_aliases_resolve() -> anyhow::Result<()> {
    for name in targets::names() {
        assert_eq!(targets::by_name(name)?.name(), *name);
    }
    assert_eq!(targets::by_name("STPL")?.name(), "shortest_path");
    assert_eq!(targets::by_name("MAXFV")?.name(), "max_flow");
    assert_eq!(targets::by_name("BCC")?.name(), "bcc");
    assert_eq!(targets::by_name("JaccardSimilarity")?.name(), "jaccard");
    assert_eq!(targets::by_name("MaxMatching")?.name(), "max_matching");
    assert!(targets::by_name("pagerank").unwrap_err().is_config());
    Ok(())
}

#[test]
fn every_target_has_independent_implementations() -> anyhow::Result<()> {
    for name in targets::names() {
        let target = targets::by_name(name)?;
        assert!(target.implementations().len() >= 2, "{name}");
        let empty = target.empty_graph();
        assert!(empty.is_empty());
        assert_eq!(empty.is_directed(), target.is_directed());
    }
    Ok(())
}

#[test]
fn implementations_agree_on_random_graphs() -> anyhow::Result<()> {
    let mut rng = Rng::new(2024);
    for name in targets::names() {
        let target = targets::by_name(name)?;
        let oracle = target.differential();
        for graph in seeds::random_graphs(&target, &mut rng) {
            let found = oracle.test(&graph, &mut rng);
            assert!(found.is_empty(), "{name}: {:?}", found[0].message);
        }
        let single = seeds::single_node(&target);
        assert!(oracle.test(&single, &mut rng).is_empty(), "{name} on one node");
    }
    Ok(())
}

#[test]
fn strongly_connected_components() -> anyhow::Result<()> {
    let target = targets::by_name("scc")?;
    let mut g = directed(&[
        (0, 1, 1.0),
        (1, 2, 1.0),
        (2, 0, 1.0),
        (2, 3, 1.0),
        (3, 4, 1.0),
        (4, 3, 1.0),
    ]);
    g.add_node(5);
    let expected: BTreeSet<BTreeSet<NodeId>> = [
        BTreeSet::from([0, 1, 2]),
        BTreeSet::from([3, 4]),
        BTreeSet::from([5]),
    ]
    .into();
    for (name, outcome) in outcomes(&target, &g, &[]) {
        assert_eq!(outcome, Outcome::Ok(Output::Components(expected.clone())), "{name}");
    }

    // Undirected input is rejected the same way by every implementation.
    let results = outcomes(&target, &undirected(&[(0, 1, 1.0)]), &[]);
    for (name, outcome) in results {
        match outcome {
            Outcome::Failed(e) => {
                assert!(e.message.contains("not implemented for undirected"), "{name}")
            }
            Outcome::Ok(o) => panic!("{name}: unexpected {o:?}"),
        }
    }
    Ok(())
}

#[test]
fn connected_components() -> anyhow::Result<()> {
    let target = targets::by_name("components")?;
    let mut g = undirected(&[(0, 1, 1.0), (2, 3, 1.0)]);
    g.add_node(4);
    let expected: BTreeSet<BTreeSet<NodeId>> = [
        BTreeSet::from([0, 1]),
        BTreeSet::from([2, 3]),
        BTreeSet::from([4]),
    ]
    .into();
    for (name, outcome) in outcomes(&target, &g, &[]) {
        assert_eq!(outcome, Outcome::Ok(Output::Components(expected.clone())), "{name}");
    }
    Ok(())
}

#[test]
fn biconnected_components() -> anyhow::Result<()> {
    let target = targets::by_name("bcc")?;
    // Two triangles sharing node 2, then a bridge out to 5.
    let mut g = Graph::new(false, false);
    for (u, v) in [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2), (4, 5)] {
        g.add_edge(u, v, None);
    }
    g.add_node(6);
    g.add_edge(7, 7, None);
    let expected: BTreeSet<BTreeSet<NodeId>> = [
        BTreeSet::from([0, 1, 2]),
        BTreeSet::from([2, 3, 4]),
        BTreeSet::from([4, 5]),
        BTreeSet::from([6]),
        BTreeSet::from([7]),
    ]
    .into();
    let found = outcomes(&target, &g, &[]);
    assert_eq!(found.len(), 2);
    for (name, outcome) in found {
        assert_eq!(outcome, Outcome::Ok(Output::Components(expected.clone())), "{name}");
    }
    Ok(())
}

#[test]
fn biconnected_components_reject_directed_graphs() -> anyhow::Result<()> {
    let target = targets::by_name("bcc")?;
    let g = directed(&[(0, 1, 1.0)]);
    let found = outcomes(&target, &g, &[]);
    assert_eq!(found.len(), 2);
    for (name, outcome) in found {
        assert!(outcome.is_failed(), "{name}");
    }
    Ok(())
}

#[test]
fn shortest_paths() -> anyhow::Result<()> {
    let target = targets::by_name("shortest_path")?;

    let g = directed(&[(0, 1, 4.0), (0, 2, 1.0), (2, 1, 2.0), (1, 3, 1.0)]);
    assert_eq!(outcomes(&target, &g, &[0, 3]).len(), 3);
    assert_all_numbers(&target, &g, &[0, 3], 4.0);

    // Dijkstra sits out negative weights.
    let g = directed(&[(0, 1, 5.0), (0, 2, 2.0), (2, 1, -4.0)]);
    assert_eq!(outcomes(&target, &g, &[0, 1]).len(), 2);
    assert_all_numbers(&target, &g, &[0, 1], -2.0);

    let g = directed(&[(0, 1, 1.0), (1, 0, -3.0), (1, 2, 1.0)]);
    for (name, outcome) in outcomes(&target, &g, &[0, 2]) {
        match outcome {
            Outcome::Failed(e) => assert_eq!(e.message, "Negative cycle detected.", "{name}"),
            Outcome::Ok(o) => panic!("{name}: unexpected {o:?}"),
        }
    }

    let g = directed(&[(1, 0, 1.0)]);
    for (name, outcome) in outcomes(&target, &g, &[0, 1]) {
        match outcome {
            Outcome::Failed(e) => assert_eq!(e.message, "Node 1 not reachable from 0", "{name}"),
            Outcome::Ok(o) => panic!("{name}: unexpected {o:?}"),
        }
    }
    Ok(())
}

#[test]
fn shortest_path_feedback_on_a_lone_node() -> anyhow::Result<()> {
    let target = targets::by_name("shortest_path")?;
    let single = seeds::single_node(&target);
    for kind in [
        FeedbackKind::Regular,
        FeedbackKind::HopCount,
        FeedbackKind::NegativeEdges,
    ] {
        let signal = target.signal_for(kind);
        let args = (signal.args)(&single);
        assert_eq!(args, [0, 0], "{kind}");
        assert_eq!(
            execute(&*signal.executor, &single, &args),
            Outcome::Ok(Output::Number(0.0)),
            "{kind}"
        );
    }
    Ok(())
}

#[test]
fn minimum_spanning_trees() -> anyhow::Result<()> {
    let target = targets::by_name("mst")?;
    let g = undirected(&[
        (0, 1, 1.0),
        (1, 2, 2.0),
        (2, 3, 3.0),
        (3, 0, 4.0),
        (0, 2, 5.0),
    ]);
    for (name, outcome) in outcomes(&target, &g, &[]) {
        let Outcome::Ok(Output::Tree(tree)) = &outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert_eq!(tree.edge_count(), 3, "{name}");
        assert_eq!(tree.total_weight(), 6.0, "{name}");
        assert_eq!(tree.node_count(), 4, "{name}");
    }

    // A forest spans every component.
    let mut forest = undirected(&[(0, 1, 2.0), (2, 3, -1.0)]);
    forest.add_node(4);
    for (name, outcome) in outcomes(&target, &forest, &[]) {
        let Outcome::Ok(Output::Tree(tree)) = &outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert_eq!(tree.edge_count(), 2, "{name}");
        assert_eq!(tree.total_weight(), 1.0, "{name}");
    }
    Ok(())
}

#[test]
fn maximum_flows() -> anyhow::Result<()> {
    let target = targets::by_name("max_flow")?;
    let g = directed(&[
        (0, 1, 3.0),
        (0, 2, 2.0),
        (1, 2, 1.0),
        (1, 3, 2.0),
        (2, 3, 3.0),
    ]);
    assert_all_numbers(&target, &g, &[0, 3], 5.0);
    assert_all_numbers(&target, &g, &[3, 0], 0.0);

    // Negative capacities carry nothing.
    let g = directed(&[(0, 1, -7.0), (0, 2, 1.0), (2, 1, 4.0)]);
    assert_all_numbers(&target, &g, &[0, 1], 1.0);
    Ok(())
}

#[test]
fn harmonic_centrality() -> anyhow::Result<()> {
    let target = targets::by_name("harmonic")?;
    let g = directed(&[(0, 1, 1.0), (1, 2, 2.0)]);
    for (name, outcome) in outcomes(&target, &g, &[]) {
        let Outcome::Ok(Output::Scores(scores)) = &outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert_eq!(scores.len(), 3, "{name}");
        assert_eq!(scores[&0], 0.0, "{name}");
        assert!((scores[&1] - 1.0).abs() < 1e-12, "{name}");
        assert!((scores[&2] - (0.5 + 1.0 / 3.0)).abs() < 1e-12, "{name}");
    }
    Ok(())
}

#[test]
fn adamic_adar_index() -> anyhow::Result<()> {
    let target = targets::by_name("adamic_adar")?;
    let mut star = Graph::new(false, false);
    for leaf in 1..=3 {
        star.add_edge(0, leaf, None);
    }
    let expected = 1.0 / 3f64.ln();
    for (name, outcome) in outcomes(&target, &star, &[]) {
        let Outcome::Ok(Output::ScoredPairs(pairs)) = &outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert_eq!(pairs.len(), 3, "{name}");
        for &(u, v, score) in pairs {
            assert!(u < v && u != 0, "{name}");
            assert!((score - expected).abs() < 1e-12, "{name}");
        }
    }
    Ok(())
}

#[test]
fn jaccard_similarity() -> anyhow::Result<()> {
    let target = targets::by_name("jaccard")?;
    let mut g = Graph::new(false, false);
    for (u, v) in [(0, 1), (1, 2), (2, 3)] {
        g.add_edge(u, v, None);
    }
    g.add_node(4);
    let expected = Output::ScoredPairs(vec![
        (0, 2, 0.5),
        (0, 3, 0.0),
        (1, 3, 0.5),
        (0, 4, 0.0),
        (1, 4, 0.0),
        (2, 4, 0.0),
        (3, 4, 0.0),
    ]);
    for (name, outcome) in outcomes(&target, &g, &[]) {
        let Outcome::Ok(out) = &outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert!(out.approx_eq(&expected, 1e-12), "{name}: {out:?}");
    }
    Ok(())
}

#[test]
fn jaccard_ignores_self_loops() -> anyhow::Result<()> {
    let target = targets::by_name("jaccard")?;
    let mut g = Graph::new(false, false);
    g.add_edge(0, 0, None);
    g.add_edge(1, 1, None);
    for (name, outcome) in outcomes(&target, &g, &[]) {
        assert_eq!(outcome, Outcome::Ok(Output::ScoredPairs(vec![(0, 1, 0.0)])), "{name}");
    }
    Ok(())
}

#[test]
fn maximum_matchings() -> anyhow::Result<()> {
    let target = targets::by_name("max_matching")?;

    let path = undirected(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
    assert_all_numbers(&target, &path, &[], 2.0);

    let star = undirected(&[(0, 1, 1.0), (0, 3, 1.0), (0, 5, 1.0)]);
    assert_all_numbers(&target, &star, &[], 1.0);

    let mut hexagon = Graph::new(false, false);
    for (u, v) in [(1, 2), (0, 1), (2, 3), (3, 4), (4, 5), (5, 0)] {
        hexagon.add_edge(u, v, None);
    }
    hexagon.add_node(6);
    assert_all_numbers(&target, &hexagon, &[], 3.0);
    Ok(())
}

#[test]
fn matchings_need_a_bipartite_graph() -> anyhow::Result<()> {
    let target = targets::by_name("max_matching")?;
    let triangle = undirected(&[(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)]);
    let found = outcomes(&target, &triangle, &[]);
    assert_eq!(found.len(), 2);
    for (name, outcome) in &found {
        let Outcome::Failed(e) = outcome else {
            panic!("{name}: unexpected {outcome:?}");
        };
        assert!(e.to_string().contains("not bipartite"), "{name}: {e}");
    }

    // The fuzzer drops edges within a parity class before testing.
    let mut rng = Rng::new(5);
    assert!(target.differential().test(&triangle, &mut rng).is_empty());
    Ok(())
}
