//! Built-in [`Metamorphism`]s.
//!
//! Each transformation applies only to the kinds of result it knows how to
//! predict, and returns `None` for everything else.

use super::{Checker, Metamorphism, Transformed};
use crate::executor::{Outcome, Output};
use crate::mutators;
use crate::{Graph, NodeId, Rng};
use std::collections::BTreeMap;

const ISOLATED_TOLERANCE: f64 = 1e-9;

fn expect(expected: Output, tolerance: f64) -> Checker {
    Box::new(move |outcome: &Outcome| {
        matches!(outcome, Outcome::Ok(out) if out.approx_eq(&expected, tolerance))
    })
}

/// Multiply every edge weight by a random factor `k` in `2..=5`, treating a
/// missing weight as `1`.
///
/// Proportional results (path lengths, flows, tree weights) must scale by
/// `k`; inverse results (harmonic centralities) by `1 / k`.
#[derive(Clone, Copy, Debug)]
pub struct ScaleWeights {
    inverse: bool,
    tolerance: f64,
}

impl ScaleWeights {
    /// Results scale with the weights.
    pub fn proportional(tolerance: f64) -> Self {
        Self {
            inverse: false,
            tolerance,
        }
    }

    /// Results scale with the reciprocal of the weights.
    pub fn inverse(tolerance: f64) -> Self {
        Self {
            inverse: true,
            tolerance,
        }
    }

    /// A checker accepting exactly the results equal to `original` scaled by
    /// `factor`, or `None` if this kind of result cannot be scaled.
    ///
    /// ```
    /// use graphfuzz::oracle::relations::ScaleWeights;
    /// use graphfuzz::{Outcome, Output};
    ///
    /// let check = ScaleWeights::checker(&Output::Number(7.0), 3.0, 1e-9).unwrap();
    /// assert!(check(&Outcome::Ok(Output::Number(21.0))));
    /// assert!(!check(&Outcome::Ok(Output::Number(20.999))));
    /// ```
    pub fn checker(original: &Output, factor: f64, tolerance: f64) -> Option<Checker> {
        let expected = match original {
            Output::Number(x) => Output::Number(x * factor),
            Output::Scores(s) => Output::Scores(s.iter().map(|(n, x)| (*n, x * factor)).collect()),
            Output::ScoredPairs(ps) => {
                Output::ScoredPairs(ps.iter().map(|(u, v, x)| (*u, *v, x * factor)).collect())
            }
            Output::Tree(t) => {
                let mut t = t.clone();
                t.map_weights(|w| Some(w.unwrap_or(1.0) * factor));
                Output::Tree(t)
            }
            Output::Components(_) => return None,
        };
        Some(expect(expected, tolerance))
    }
}

impl Metamorphism for ScaleWeights {
    fn name(&self) -> &str {
        if self.inverse {
            "inverse_weight_scaling"
        } else {
            "weight_scaling"
        }
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed> {
        let k = rng.gen_range_i64(2..=5) as f64;
        let factor = if self.inverse { 1.0 / k } else { k };
        let checker = Self::checker(result, factor, self.tolerance)?;
        let mut scaled = graph.clone();
        scaled.map_weights(|w| Some(w.unwrap_or(1.0) * k));
        Some(Transformed {
            graph: scaled,
            args: args.to_vec(),
            checker,
        })
    }
}

/// Flip every edge of a directed graph, and swap a `[source, target]`
/// argument pair.
///
/// Partitions and pairwise quantities (path length, flow value) are
/// unchanged.
#[derive(Clone, Copy, Debug)]
pub struct ReverseEdges {
    /// Allowed difference between floating point results.
    pub tolerance: f64,
}

impl Metamorphism for ReverseEdges {
    fn name(&self) -> &str {
        "edge_reversal"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        _rng: &mut Rng,
    ) -> Option<Transformed> {
        if !graph.is_directed() {
            return None;
        }
        match result {
            Output::Components(_) => {}
            Output::Number(_) if args.len() == 2 => {}
            _ => return None,
        }
        Some(Transformed {
            graph: graph.reversed(),
            args: args.iter().rev().copied().collect(),
            checker: expect(result.clone(), self.tolerance),
        })
    }
}

/// Rename every node to a fresh id. The result is renamed the same way.
#[derive(Clone, Copy, Debug)]
pub struct RelabelNodes {
    /// Allowed difference between floating point results.
    pub tolerance: f64,
}

impl Metamorphism for RelabelNodes {
    fn name(&self) -> &str {
        "node_relabeling"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed> {
        let offset = NodeId::try_from(rng.gen_range_usize(1..=100)).ok()?;
        let mut fresh: Vec<NodeId> = (0..graph.node_count())
            .map(|i| NodeId::try_from(i).ok().and_then(|i| i.checked_add(offset)))
            .collect::<Option<_>>()?;
        rng.shuffle(&mut fresh);
        let map: BTreeMap<NodeId, NodeId> = graph.nodes().zip(fresh).collect();

        Some(Transformed {
            graph: graph.relabel(&map),
            args: args.iter().map(|a| map.get(a).copied().unwrap_or(*a)).collect(),
            checker: expect(result.relabel(&map), self.tolerance),
        })
    }
}

/// Add a node with no edges.
///
/// A partition gains a singleton part, per-node scores gain a zero, and
/// single numbers are unchanged.
#[derive(Clone, Copy, Debug)]
pub struct AddIsolatedNode;

impl Metamorphism for AddIsolatedNode {
    fn name(&self) -> &str {
        "isolated_node_insertion"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        _rng: &mut Rng,
    ) -> Option<Transformed> {
        let node = graph.next_node_id();
        let expected = match result {
            Output::Number(x) => Output::Number(*x),
            Output::Tree(t) => Output::Tree(t.clone()),
            Output::Components(cs) => {
                let mut cs = cs.clone();
                cs.insert([node].into());
                Output::Components(cs)
            }
            Output::Scores(s) => {
                let mut s = s.clone();
                s.insert(node, 0.0);
                Output::Scores(s)
            }
            Output::ScoredPairs(_) => return None,
        };
        let mut grown = graph.clone();
        grown.add_node(node);
        Some(Transformed {
            graph: grown,
            args: args.to_vec(),
            checker: expect(expected, ISOLATED_TOLERANCE),
        })
    }
}

/// Add a random edge. The number of (strongly) connected components can
/// only stay the same or drop.
#[derive(Clone, Copy, Debug)]
pub struct AddEdgeMonotone;

impl Metamorphism for AddEdgeMonotone {
    fn name(&self) -> &str {
        "edge_insertion_monotonicity"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed> {
        let Output::Components(before) = result else {
            return None;
        };
        if graph.is_empty() {
            return None;
        }
        let before = before.len();
        let mut grown = graph.clone();
        mutators::add_edge(&mut grown, rng);
        Some(Transformed {
            graph: grown,
            args: args.to_vec(),
            checker: Box::new(move |outcome: &Outcome| {
                matches!(outcome, Outcome::Ok(Output::Components(after)) if after.len() <= before)
            }),
        })
    }
}

/// Add a detour `source -> fresh -> target` strictly longer than the current
/// shortest path. The shortest path length must not change.
///
/// Only applies to weighted directed graphs with a finite `[source, target]`
/// path length.
#[derive(Clone, Copy, Debug)]
pub struct LongerDetour {
    /// Allowed difference between path lengths.
    pub tolerance: f64,
}

impl Metamorphism for LongerDetour {
    fn name(&self) -> &str {
        "longer_detour"
    }

    fn mutate(
        &self,
        graph: &Graph,
        args: &[NodeId],
        result: &Output,
        rng: &mut Rng,
    ) -> Option<Transformed> {
        let (&[source, target], Output::Number(length)) = (args, result) else {
            return None;
        };
        if !graph.is_directed() || !graph.is_weighted() || !length.is_finite() {
            return None;
        }
        let total = length.abs().ceil() + rng.gen_range_i64(1..=10) as f64;
        let first = (total / 2.0).floor();
        let second = total - first;

        let fresh = graph.next_node_id();
        let mut detoured = graph.clone();
        detoured.add_edge(source, fresh, Some(first));
        detoured.add_edge(fresh, target, Some(second));
        Some(Transformed {
            graph: detoured,
            args: args.to_vec(),
            checker: expect(Output::Number(*length), self.tolerance),
        })
    }
}
