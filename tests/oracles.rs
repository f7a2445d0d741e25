use graphfuzz::oracle::relations::{AddIsolatedNode, ScaleWeights};
use graphfuzz::oracle::{Arguments, Differential, Implementation, Metamorphic, TestOracle};
use graphfuzz::{seeds, targets, ExecError, Graph, NodeId, Outcome, Output, Rng};

fn constant(x: f64) -> impl Fn(&Graph, &[NodeId]) -> Result<Output, ExecError> {
    move |_, _| Ok(Output::Number(x))
}

fn failing(_: &Graph, _: &[NodeId]) -> Result<Output, ExecError> {
    Err(ExecError::algorithm("Negative cycle detected."))
}

fn path() -> Graph {
    let mut g = Graph::new(true, false);
    g.add_edge(0, 1, Some(2.0));
    g.add_edge(1, 2, Some(5.0));
    g
}

#[test]
fn agreeing_implementations_report_nothing() -> anyhow::Result<()> {
    let oracle = Differential::new()
        .implementation(Implementation::new("a", constant(3.0)))
        .implementation(Implementation::new("b", constant(3.0)));
    assert!(oracle.test(&path(), &mut Rng::new(0)).is_empty());
    Ok(())
}

#[test]
fn disagreement_names_both_implementations() -> anyhow::Result<()> {
    let oracle = Differential::new()
        .implementation(Implementation::new("a", constant(3.0)))
        .implementation(Implementation::new("b", constant(4.0)));
    let found = oracle.test(&path(), &mut Rng::new(0));
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains('a'));
    assert!(found[0].message.contains('b'));
    assert_eq!(found[0].graph, path());
    assert!(found[0].mutated.is_none());
    Ok(())
}

#[test]
fn every_disagreeing_pair_is_reported() -> anyhow::Result<()> {
    let oracle = Differential::new()
        .implementation(Implementation::new("one", constant(1.0)))
        .implementation(Implementation::new("two", constant(2.0)))
        .implementation(Implementation::new("also_one", constant(1.0)));
    let found = oracle.test(&path(), &mut Rng::new(0));
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].message,
        "Results of one and two are different for a graph!--\
         Results of two and also_one are different for a graph!"
    );
    Ok(())
}

#[test]
fn tolerance_absorbs_rounding() -> anyhow::Result<()> {
    let oracle = Differential::new()
        .implementation(Implementation::new("a", constant(0.3)))
        .implementation(Implementation::new("b", constant(0.1 + 0.2)));
    assert!(oracle.test(&path(), &mut Rng::new(0)).len() == 1);
    let oracle = Differential::new()
        .implementation(Implementation::new("a", constant(0.3)))
        .implementation(Implementation::new("b", constant(0.1 + 0.2)))
        .tolerance(1e-9);
    assert!(oracle.test(&path(), &mut Rng::new(0)).is_empty());
    Ok(())
}

#[test]
fn failures_compare_as_values() -> anyhow::Result<()> {
    // Two failures agree; a failure and a success do not.
    let oracle = Differential::new()
        .implementation(Implementation::new("x", failing))
        .implementation(Implementation::new("y", failing));
    assert!(oracle.test(&path(), &mut Rng::new(0)).is_empty());

    let oracle = Differential::new()
        .implementation(Implementation::new("x", failing))
        .implementation(Implementation::new("y", constant(f64::INFINITY)));
    assert_eq!(oracle.test(&path(), &mut Rng::new(0)).len(), 1);

    // With a sentinel, a failure stands in for that value.
    let oracle = Differential::new()
        .implementation(Implementation::new("x", failing))
        .implementation(Implementation::new("y", constant(f64::INFINITY)))
        .sentinel(Output::Number(f64::INFINITY));
    assert!(oracle.test(&path(), &mut Rng::new(0)).is_empty());
    Ok(())
}

#[test]
fn panics_are_contained() -> anyhow::Result<()> {
    let panicking = |_: &Graph, _: &[NodeId]| -> Result<Output, ExecError> {
        panic!("index out of bounds")
    };
    let oracle = Differential::new()
        .implementation(Implementation::new("p", panicking))
        .implementation(Implementation::new("q", constant(1.0)));
    assert_eq!(oracle.test(&path(), &mut Rng::new(0)).len(), 1);
    Ok(())
}

#[test]
fn guarded_implementations_sit_out() -> anyhow::Result<()> {
    fn positive(g: &Graph) -> bool {
        !g.has_negative_weight()
    }
    let oracle = Differential::new()
        .implementation(Implementation::new("a", constant(1.0)))
        .implementation(Implementation::new("b", constant(2.0)).guarded(positive));

    let mut negative = path();
    negative.add_edge(2, 0, Some(-1.0));
    assert!(oracle.test(&negative, &mut Rng::new(0)).is_empty());
    assert_eq!(oracle.test(&path(), &mut Rng::new(0)).len(), 1);
    Ok(())
}

#[test]
fn node_pairs_are_drawn_per_round() -> anyhow::Result<()> {
    let echo = |_: &Graph, args: &[NodeId]| -> Result<Output, ExecError> {
        Ok(Output::Number(args[0] as f64))
    };
    let oracle = Differential::new()
        .implementation(Implementation::new("echo", echo))
        .implementation(Implementation::new("zero", constant(0.0)))
        .arguments(Arguments::NodePairs { rounds: 5 });

    let found = oracle.test(&path(), &mut Rng::new(2));
    assert!(found.len() <= 5);
    for d in &found {
        assert_eq!(d.args.len(), 2);
        assert_ne!(d.args[0], d.args[1]);
        assert_ne!(d.args[0], 0);
    }

    // Too small to draw a pair from.
    let mut single = Graph::new(true, false);
    single.add_node(0);
    assert!(oracle.test(&single, &mut Rng::new(2)).is_empty());
    Ok(())
}

#[test]
fn scaling_checker_is_exact_up_to_tolerance() -> anyhow::Result<()> {
    let check = ScaleWeights::checker(&Output::Number(7.0), 3.0, 1e-9).expect("numbers scale");
    assert!(check(&Outcome::Ok(Output::Number(21.0))));
    assert!(!check(&Outcome::Ok(Output::Number(20.999))));
    assert!(!check(&Outcome::Failed(ExecError::other("boom"))));
    Ok(())
}

#[test]
fn metamorphic_violation_keeps_both_inputs() -> anyhow::Result<()> {
    // Counts nodes where edges were meant.
    let buggy = |g: &Graph, _: &[NodeId]| -> Result<Output, ExecError> {
        Ok(Output::Number(g.node_count() as f64))
    };
    let oracle =
        Metamorphic::new(Implementation::new("buggy", buggy)).metamorphism(AddIsolatedNode);
    let found = oracle.test(&path(), &mut Rng::new(0));
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].message,
        "Metamorphic relation isolated_node_insertion violated by buggy!"
    );
    let (mutated, _) = found[0].mutated.as_ref().expect("the transformed input");
    assert_eq!(mutated.node_count(), path().node_count() + 1);
    Ok(())
}

#[test]
fn correct_implementations_satisfy_their_relations() -> anyhow::Result<()> {
    let mut rng = Rng::new(17);
    for name in [
        "scc",
        "components",
        "bcc",
        "harmonic",
        "jaccard",
        "max_matching",
    ] {
        let target = targets::by_name(name)?;
        for implementation in target.implementations() {
            let oracle = target.metamorphic(&implementation.name, 20)?;
            for graph in seeds::random_graphs(&target, &mut rng) {
                let found = oracle.test(&graph, &mut rng);
                assert!(found.is_empty(), "{name}/{}: {found:?}", implementation.name);
            }
        }
    }
    Ok(())
}

#[test]
fn unknown_metamorphic_algorithm_is_a_config_error() -> anyhow::Result<()> {
    let target = targets::by_name("mst")?;
    assert!(target.metamorphic("christofides", 10).unwrap_err().is_config());
    Ok(())
}
