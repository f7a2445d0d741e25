//! A thin-but-stable wrapper over `rand::rngs::SmallRng` with the handful of
//! draws the fuzzer needs.

use rand::{rngs::SmallRng, seq::SliceRandom as _, Rng as _, SeedableRng};
use std::ops::RangeInclusive;

const DEFAULT_SEED: u64 = 0x12345678_12345678;

/// A pseudorandom number generator.
///
/// Not cryptographically secure. Every random decision the fuzzer makes goes
/// through an `Rng`, so a run configured with a fixed seed is reproducible up
/// to the nondeterminism of the executors themselves.
#[derive(Clone, Debug)]
pub struct Rng {
    inner: SmallRng,
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Rng {
    /// Create a new `Rng` from the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create a new `Rng` seeded from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self {
            inner: SmallRng::from_entropy(),
        }
    }

    /// Derive an independent generator from this one.
    ///
    /// Used to hand a worker thread its own stream without sharing state.
    pub fn fork(&mut self) -> Self {
        Self::new(self.gen_u64())
    }

    /// Generate a random `usize` in the range `0..len`.
    ///
    /// If `len` is `0`, then `None` is returned.
    #[inline]
    pub fn gen_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        // https://lemire.me/blog/2016/06/30/fast-random-shuffling/
        let random32bit = u64::from(self.gen_u32());
        let multiresult = random32bit.wrapping_mul(len as u64);
        Some((multiresult >> 32) as usize)
    }

    /// Choose a random element from an iterator.
    ///
    /// If the iterator is empty, then `None` is returned.
    #[inline]
    pub fn choose<I>(&mut self, iter: I) -> Option<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
    {
        let mut iter = iter.into_iter();
        let idx = self.gen_index(iter.len())?;
        iter.nth(idx)
    }

    /// Generate a uniformly random integer in the given inclusive range.
    #[inline]
    pub fn gen_range_i64(&mut self, range: RangeInclusive<i64>) -> i64 {
        self.inner.gen_range(range)
    }

    /// Generate a uniformly random `usize` in the given inclusive range.
    #[inline]
    pub fn gen_range_usize(&mut self, range: RangeInclusive<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Return `true` with probability `p`.
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Shuffle a slice in place.
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    /// Generate a random `u32` value.
    #[inline]
    pub fn gen_u32(&mut self) -> u32 {
        self.inner.gen()
    }

    /// Generate a random `u64` value.
    #[inline]
    pub fn gen_u64(&mut self) -> u64 {
        self.inner.gen()
    }

    /// Generate a random `f64` value in `[0, 1)`.
    #[inline]
    pub fn gen_f64(&mut self) -> f64 {
        self.inner.gen()
    }
}
