//! Reducing executor outputs to small, hashable fingerprints.
//!
//! Output-novelty feedback keeps a graph when its fingerprint has never been
//! seen before, so the reduction decides how fine-grained "new behavior" is.

use crate::Output;
use std::fmt;

/// A hashable summary of an output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fingerprint {
    /// An integer.
    Int(i64),
    /// A non-integral float, by its bit pattern.
    Real(u64),
    /// A string.
    Text(String),
    /// A tuple of fingerprints.
    Tuple(Vec<Fingerprint>),
}

const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Fingerprint {
    /// Fingerprint a float.
    ///
    /// Integral values become [`Fingerprint::Int`], so `5.0` and `5` collide.
    /// Every `NaN` maps to the same fingerprint, and `-0.0` to `0`.
    ///
    /// ```
    /// use graphfuzz::fingerprint::Fingerprint;
    ///
    /// assert_eq!(Fingerprint::number(5.0), Fingerprint::Int(5));
    /// assert_eq!(Fingerprint::number(f64::NAN), Fingerprint::number(-f64::NAN));
    /// assert_ne!(Fingerprint::number(0.5), Fingerprint::number(0.25));
    /// ```
    pub fn number(x: f64) -> Self {
        if x.is_nan() {
            Fingerprint::Real(f64::NAN.to_bits())
        } else if x.fract() == 0.0 && x.abs() < MAX_EXACT_INT {
            Fingerprint::Int(x as i64)
        } else {
            Fingerprint::Real(x.to_bits())
        }
    }

    /// Fingerprint a tuple.
    pub fn tuple(parts: impl IntoIterator<Item = Fingerprint>) -> Self {
        Fingerprint::Tuple(parts.into_iter().collect())
    }
}

impl From<i64> for Fingerprint {
    fn from(x: i64) -> Self {
        Fingerprint::Int(x)
    }
}

impl From<usize> for Fingerprint {
    fn from(x: usize) -> Self {
        Fingerprint::Int(i64::try_from(x).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Fingerprint::Text(s.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Int(x) => write!(f, "{x}"),
            Fingerprint::Real(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Fingerprint::Text(s) => write!(f, "{s:?}"),
            Fingerprint::Tuple(parts) => {
                f.write_str("(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Turns an [`Output`] into a [`Fingerprint`].
///
/// Implemented for every `Fn(&Output) -> Fingerprint + Send + Sync`.
pub trait Reducer: Send + Sync {
    /// Reduce `output`.
    fn reduce(&self, output: &Output) -> Fingerprint;
}

impl<F> Reducer for F
where
    F: Fn(&Output) -> Fingerprint + Send + Sync,
{
    fn reduce(&self, output: &Output) -> Fingerprint {
        self(output)
    }
}

/// The reduction used when a target does not provide its own.
///
/// * numbers are kept as they are,
/// * a partition becomes the size of its largest part (`0` if empty),
/// * scored pairs become their largest score (`0` if none),
/// * per-node scores become the number of scored nodes,
/// * a spanning structure becomes `(total weight, edge count)` where a
///   missing weight counts as `1`.
///
/// ```
/// use graphfuzz::fingerprint::{DefaultReducer, Fingerprint, Reducer};
/// use graphfuzz::Output;
/// use std::collections::BTreeSet;
///
/// let parts: BTreeSet<BTreeSet<u32>> = [
///     BTreeSet::from([0, 1, 2]),
///     BTreeSet::from([3]),
/// ].into();
/// assert_eq!(DefaultReducer.reduce(&Output::Components(parts)), Fingerprint::Int(3));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultReducer;

impl Reducer for DefaultReducer {
    fn reduce(&self, output: &Output) -> Fingerprint {
        match output {
            Output::Number(x) => Fingerprint::number(*x),
            Output::Components(cs) => cs.iter().map(|c| c.len()).max().unwrap_or(0).into(),
            Output::ScoredPairs(ps) => Fingerprint::number(
                ps.iter()
                    .map(|(_, _, s)| *s)
                    .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))
                    .unwrap_or(0.0),
            ),
            Output::Scores(s) => s.len().into(),
            Output::Tree(g) => Fingerprint::tuple([
                Fingerprint::number(g.total_weight()),
                g.edge_count().into(),
            ]),
        }
    }
}
