use graphfuzz::mutators::{self as m, GraphMutator, Operator};
use graphfuzz::scheduler::{MemScheduler, Scheduler};
use graphfuzz::{seeds, targets, Graph, Rng, Session};

fn single_node(directed: bool, multigraph: bool) -> Graph {
    let mut g = Graph::new(directed, multigraph);
    g.add_node(0);
    g
}

#[test]
fn single_stacked_mutations_keep_the_edge_invariant() -> anyhow::Result<()> {
    for (directed, multigraph) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut session = Session::new().seed(11).stack_depth(1..=1);
        let mut mutator = GraphMutator::new();
        let mut graph = single_node(directed, multigraph);
        for _ in 0..2_000 {
            let applied = session.stacked_mutate_with(&mut mutator, &mut graph)?;
            assert_eq!(applied, 1);
            graph.validate()?;
            assert_eq!(graph.is_directed(), directed);
            assert_eq!(graph.is_multigraph(), multigraph);
        }
    }
    Ok(())
}

#[test]
fn deep_stacks_with_a_corpus_keep_the_edge_invariant() -> anyhow::Result<()> {
    let target = targets::by_name("shortest_path")?;
    let mut rng = Rng::new(3);
    let mut corpus = MemScheduler::new();
    corpus.add_to_corpus(seeds::random_graphs(&target, &mut rng))?;

    let mut session = Session::new().seed(4).stack_depth(1..=8);
    let mut graph = seeds::single_node(&target);
    for _ in 0..300 {
        let mut mutator = GraphMutator::new().with_corpus(&mut corpus);
        session.stacked_mutate_with(&mut mutator, &mut graph)?;
        graph.validate()?;
        assert!(graph.node_count() <= m::MAX_NODES + 8);
        if graph.node_count() > 40 {
            graph = seeds::single_node(&target);
        }
    }
    Ok(())
}

#[test]
fn growing_operators_only_grow() -> anyhow::Result<()> {
    let mut session = Session::new().seed(1);
    let mut mutator = GraphMutator::new().operators([Operator::AddNode, Operator::AddEdge]);
    let mut graph = single_node(false, false);
    let mut nodes = graph.node_count();
    let mut edges = graph.edge_count();
    for _ in 0..50 {
        session.stacked_mutate_with(&mut mutator, &mut graph)?;
        assert!(graph.node_count() >= nodes);
        assert!(graph.edge_count() >= edges);
        nodes = graph.node_count();
        edges = graph.edge_count();
    }
    assert!(nodes > 1);
    Ok(())
}

#[test]
fn inapplicable_operators_exhaust() -> anyhow::Result<()> {
    let mut session = Session::new();
    let mut mutator = GraphMutator::new().operators([Operator::DeleteEdge, Operator::ReweightEdge]);
    let mut graph = single_node(true, false);
    let err = session.mutate_with(&mut mutator, &mut graph).unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(graph, single_node(true, false));
    Ok(())
}

#[test]
fn new_edges_follow_existing_weighting() -> anyhow::Result<()> {
    let mut rng = Rng::new(8);

    let mut unweighted = Graph::new(true, false);
    unweighted.add_edge(0, 1, None);
    for _ in 0..20 {
        m::add_edge(&mut unweighted, &mut rng);
    }
    assert!(unweighted.edges().iter().all(|e| e.weight.is_none()));

    let mut weighted = Graph::new(true, false);
    weighted.add_edge(0, 1, Some(4.0));
    weighted.add_node(2);
    for _ in 0..20 {
        m::add_edge(&mut weighted, &mut rng);
    }
    assert!(weighted.edges().iter().all(|e| e.weight.is_some()));
    Ok(())
}

#[test]
fn operator_names_round_trip() -> anyhow::Result<()> {
    for op in Operator::ALL {
        assert_eq!(op.name().parse::<Operator>()?, op);
    }
    assert!("splice".parse::<Operator>().unwrap_err().is_config());
    Ok(())
}

#[test]
fn shuffles_are_seeded_permutations() -> anyhow::Result<()> {
    let original: Vec<u32> = (0..50).collect();

    let mut a = original.clone();
    let mut b = original.clone();
    Rng::new(11).shuffle(&mut a);
    Rng::new(11).shuffle(&mut b);
    assert_eq!(a, b);
    assert_ne!(a, original);

    a.sort_unstable();
    assert_eq!(a, original);

    let mut empty: Vec<u32> = Vec::new();
    Rng::new(0).shuffle(&mut empty);
    assert!(empty.is_empty());
    Ok(())
}
