#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod _guide;
pub mod bugs;
pub mod config;
pub mod coverage;
pub mod error;
pub mod executor;
pub mod feedback;
pub mod fingerprint;
pub mod fuzzer;
pub mod graph;
pub mod mutators;
pub mod oracle;
pub mod persist;
mod rng;
pub mod scheduler;
pub mod seeds;
pub mod targets;

use std::ops::RangeInclusive;

pub use error::{Error, ErrorKind, ErrorMessage, Result, ResultExt};
pub use executor::{ExecError, Executor, Outcome, Output};
pub use fuzzer::{Fuzzer, StopToken, Summary};
pub use graph::{Edge, Graph, NodeId};
pub use rng::Rng;

/// The default number of primitive mutations stacked onto a graph by
/// [`Session::stacked_mutate_with`].
pub const DEFAULT_STACK_DEPTH: RangeInclusive<usize> = 2..=6;

/// A mutation session and its configuration.
///
/// This type allows you to configure things like the RNG seed and how many
/// primitive mutations are stacked per call to
/// [`stacked_mutate_with`][Session::stacked_mutate_with].
///
/// A session should be reused while a particular value, or set of values, are
/// being repeatedly mutated.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::{mutators::GraphMutator, Graph, Session};
///
/// let mut session = Session::new()
///     // Configure the RNG seed, changing which random mutations are chosen.
///     .seed(0x12345678);
///
/// let mut graph = Graph::new(true, false);
/// graph.add_node(0);
///
/// // Without a corpus to draw from, the combine operator is never chosen.
/// let mut mutator = GraphMutator::new();
/// for _ in 0..3 {
///     session.stacked_mutate_with(&mut mutator, &mut graph)?;
///     println!("mutated graph is {graph}");
/// }
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
#[derive(Debug)]
pub struct Session {
    context: Context,
    stack_depth: RangeInclusive<usize>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new, default `Session`.
    pub fn new() -> Self {
        Self::with_rng(Rng::default())
    }

    /// Create a new `Session` driven by the given random number generator.
    pub fn with_rng(rng: Rng) -> Self {
        Self {
            context: Context { rng },
            stack_depth: DEFAULT_STACK_DEPTH,
        }
    }

    /// Set the seed for the random number generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.context.rng = Rng::new(seed);
        self
    }

    /// Set how many primitive mutations a stacked mutation applies.
    ///
    /// Defaults to [`DEFAULT_STACK_DEPTH`]. An empty range is treated as a
    /// single mutation.
    pub fn stack_depth(mut self, depth: RangeInclusive<usize>) -> Self {
        self.stack_depth = depth;
        self
    }

    /// This session's random number generator.
    pub fn rng(&mut self) -> &mut Rng {
        self.context.rng()
    }

    /// Apply exactly one mutation, chosen uniformly among every candidate
    /// that `mutator` registers for `value`.
    pub fn mutate_with<T>(&mut self, mutator: &mut impl Mutate<T>, value: &mut T) -> Result<()> {
        self.context.mutate_with(mutator, value)
    }

    /// Apply a random number of mutations, one after another, to `value`.
    ///
    /// The count is drawn uniformly from the configured stack depth. Returns
    /// the number of mutations that were applied.
    pub fn stacked_mutate_with<T>(
        &mut self,
        mutator: &mut impl Mutate<T>,
        value: &mut T,
    ) -> Result<usize> {
        let (lo, hi) = (*self.stack_depth.start(), *self.stack_depth.end());
        let depth = if lo > hi {
            1
        } else {
            self.context.rng.gen_range_usize(lo..=hi)
        };
        log::trace!("stacking {depth} mutations");
        for _ in 0..depth {
            self.context.mutate_with(mutator, value)?;
        }
        Ok(depth)
    }
}

/// The context for the current mutation.
///
/// Every candidate mutation, which is a closure that will perform its
/// associated changes when invoked, is given a context.
///
/// You do not create contexts directly. You create [`Session`s][crate::Session]
/// which internally manage contexts for you, passing them to the candidate
/// mutation closure that was chosen for execution as needed.
#[derive(Debug)]
pub struct Context {
    rng: Rng,
}

impl Context {
    /// Get this context's random number generator.
    #[inline]
    #[must_use]
    pub fn rng(&mut self) -> &mut Rng {
        &mut self.rng
    }

    #[inline]
    pub(crate) fn mutate_with<T>(
        &mut self,
        mutator: &mut impl Mutate<T>,
        value: &mut T,
    ) -> Result<()> {
        self.choose_and_apply_mutation(value, |c, value| mutator.mutate(c, value))
    }

    fn choose_and_apply_mutation<T>(
        &mut self,
        value: &mut T,
        mut mutate_impl: impl FnMut(&mut Candidates, &mut T) -> Result<()>,
    ) -> Result<()> {
        log::trace!("=== choosing and applying a mutation ===");

        // Count how many mutations we *could* perform.
        let mut candidates = Candidates {
            context: self,
            phase: Phase::Count(0),
            applied_mutation: false,
        };
        mutate_impl(&mut candidates, value)?;

        let count = match candidates.phase {
            Phase::Count(count) => count,
            Phase::Mutate { .. } => unreachable!(),
        };
        log::trace!("counted {count} mutations");

        // Choose a random target mutation to actually perform.
        let Some(target) = candidates.context.rng().gen_index(count as usize) else {
            log::trace!("mutator exhausted");
            return Err(Error::exhausted());
        };
        log::trace!("targeting mutation {target}");

        // Perform the chosen target mutation.
        candidates.phase = Phase::Mutate {
            current: 0,
            target: target as u32,
        };
        match mutate_impl(&mut candidates, value) {
            Err(e) if e.is_early_exit() => {
                log::trace!("mutation applied successfully");
                Ok(())
            }

            Err(e) => {
                log::error!("failed to apply mutation: {e}");
                Err(e)
            }

            // The chosen mutation ran but its early-exit error was swallowed:
            // some mutator is missing a `?` on `Candidates::mutation`.
            Ok(()) if candidates.applied_mutation => {
                panic!(
                    "We applied a mutation but did not receive an early-exit error \
                     from the mutator. Errors must be `?`-propagated from every \
                     `Candidates::mutation` call in `Mutate::mutate` implementations.",
                )
            }
            Ok(()) => {
                let current = match candidates.phase {
                    Phase::Mutate { current, .. } => current,
                    Phase::Count(_) => unreachable!(),
                };
                panic!(
                    "Nondeterministic mutator implementation: did not enumerate the \
                     same set of mutations when given the same value! Counted {count} \
                     mutations in the first pass, but only found {current} mutations on \
                     the second pass. Mutators must be deterministic.",
                )
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Count(u32),
    Mutate { current: u32, target: u32 },
}

/// The set of mutations that can be applied to a value.
///
/// Mutators register every mutation they could perform on a value through
/// [`Candidates::mutation`]; the session then picks one of them uniformly at
/// random and applies only that one.
pub struct Candidates<'a> {
    context: &'a mut Context,
    phase: Phase,
    applied_mutation: bool,
}

impl<'a> Candidates<'a> {
    /// Register a candidate mutation that can be applied to a value.
    ///
    /// `f` should be a closure that performs the mutation on the value that was
    /// passed to `Mutate::mutate`, updating the value and the mutator itself as
    /// necessary. The result of this method must always be `?`-propagated.
    #[inline]
    pub fn mutation(&mut self, mut f: impl FnMut(&mut Context) -> Result<()>) -> Result<()> {
        match &mut self.phase {
            Phase::Count(count) => {
                *count += 1;
                Ok(())
            }
            Phase::Mutate { current, target } => {
                assert!(
                    *current <= *target,
                    "{current} <= {target}; did you forget to `?`-propagate the \
                     result of a `Candidates::mutation` call?",
                );
                if *current == *target {
                    self.applied_mutation = true;
                    f(self.context)?;
                    Err(Error::early_exit())
                } else {
                    *current += 1;
                    Ok(())
                }
            }
        }
    }
}

/// A trait for mutating values in place.
///
/// # Implementing the `mutate` Method
///
/// Register every mutation that a mutator *could* perform by invoking
/// [`mutations.mutation(...)`][Candidates::mutation], passing in a closure
/// that performs that mutation.
///
/// `mutate` implementations must only modify `self` and `value` from inside
/// a registered mutation closure, and must be deterministic: given the same
/// inputs, the same set of mutations must be registered in the same order.
/// Under the hood `mutate` is called twice for every applied mutation, once
/// to count the candidates and once to run the chosen one.
///
/// Never return an [`Exhausted`][ErrorKind::Exhausted] error yourself. Simply
/// register nothing, and the session reports exhaustion.
///
/// # Example
///
/// ```
/// # fn foo() -> graphfuzz::Result<()> {
/// use graphfuzz::{Candidates, Graph, Mutate, Result, Session};
///
/// /// Only ever deletes nodes.
/// struct Shrink;
///
/// impl Mutate<Graph> for Shrink {
///     fn mutate(&mut self, mutations: &mut Candidates<'_>, graph: &mut Graph) -> Result<()> {
///         for node in graph.nodes().collect::<Vec<_>>() {
///             mutations.mutation(|_ctx| {
///                 graph.remove_node(node);
///                 Ok(())
///             })?;
///         }
///         Ok(())
///     }
/// }
///
/// let mut graph = Graph::new(false, false);
/// graph.add_edge(0, 1, None);
///
/// let mut session = Session::new();
/// session.mutate_with(&mut Shrink, &mut graph)?;
/// session.mutate_with(&mut Shrink, &mut graph)?;
/// assert!(graph.is_empty());
///
/// // Nothing left to delete.
/// assert!(session.mutate_with(&mut Shrink, &mut graph).unwrap_err().is_exhausted());
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
pub trait Mutate<T>
where
    T: ?Sized,
{
    /// Pseudo-randomly mutate the given value.
    fn mutate(&mut self, mutations: &mut Candidates<'_>, value: &mut T) -> Result<()>;

    /// Borrows a mutator, rather than consuming it.
    #[inline]
    fn by_ref(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self
    }
}

fn _static_assert_object_safety(_: &dyn Mutate<Graph>) {}

impl<M, T> Mutate<T> for &mut M
where
    M: Mutate<T>,
{
    fn mutate(&mut self, c: &mut Candidates, value: &mut T) -> Result<()> {
        (**self).mutate(c, value)
    }
}
