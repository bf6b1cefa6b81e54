//! Deterministic Random State
//!
//! [`RngStream`] is the random-state token threaded through every stochastic
//! evaluation. It is a small `Copy` value: a compiled function receives the
//! current token by value, draws from its own copy, and hands the advanced
//! token back. Nothing else in the process holds random state, so a
//! trajectory is a pure function of the initial seed and the action sequence.
//!
//! # PRNG Algorithm
//!
//! SplitMix64: deterministic, portable, and cheap enough to split per level
//! member.
//!
//! # Stream Model
//!
//! ```text
//! seed
//!   └─> engine stream (advances with each draw)
//!         ├─> for_member(i)      one independent sub-stream per level member
//!         └─> fold(members)      members' returned streams, combined in index order
//! ```

use std::f64::consts::PI;

/// A deterministic pseudo-random number stream.
///
/// Each generation method advances the stream state. Streams never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RngStream {
    state: u64,
}

impl RngStream {
    /// Create a new RNG stream from a seed.
    #[inline]
    pub const fn new(seed: u64) -> Self {
        // Ensure non-zero state (SplitMix64 requirement)
        let state = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state }
    }

    /// Sub-stream for member `index` of a group evaluated together.
    ///
    /// Members of the same group get distinct streams that depend only on the
    /// parent state and the member's position, never on scheduling.
    #[inline]
    pub fn for_member(&self, index: u64) -> Self {
        Self::new(splitmix64_mix(self.state ^ splitmix64_mix(index.wrapping_add(1))))
    }

    /// Combine the streams returned by a group's members into the stream the
    /// group hands back.
    ///
    /// Members are folded strictly in the order given, so callers pass them in
    /// member index order. The parent always advances, even for an empty
    /// group.
    pub fn fold<I>(&self, members: I) -> Self
    where
        I: IntoIterator<Item = RngStream>,
    {
        let mut acc = splitmix64_next(self.state);
        for member in members {
            acc = splitmix64_mix(acc ^ member.state);
            acc = splitmix64_next(acc);
        }
        Self::new(splitmix64_mix(acc))
    }

    /// Get the current internal state (for debugging/testing).
    #[inline]
    pub const fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next random u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = splitmix64_next(self.state);
        splitmix64_mix(self.state)
    }

    /// Generate a uniform random f64 in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        u64_to_f64_01(self.next_u64())
    }

    /// Standard normal sample (Box-Muller).
    #[inline]
    pub fn normal(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        // Avoid log(0)
        let u1 = if u1 == 0.0 { f64::MIN_POSITIVE } else { u1 };
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Normal sample with given mean and standard deviation.
    #[inline]
    pub fn normal_with(&mut self, mean: f64, stddev: f64) -> f64 {
        mean + self.normal() * stddev
    }

    /// Bernoulli sample with given probability of `true`.
    #[inline]
    pub fn bernoulli(&mut self, probability: f64) -> bool {
        self.uniform() < probability
    }
}

impl Default for RngStream {
    fn default() -> Self {
        Self::new(0)
    }
}

/// SplitMix64 state transition function.
#[inline]
const fn splitmix64_next(state: u64) -> u64 {
    state.wrapping_add(0x9E3779B97F4A7C15)
}

/// SplitMix64 mixing function for deriving new states.
#[inline]
const fn splitmix64_mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Convert a u64 to a uniform f64 in [0, 1) using the upper 53 bits.
#[inline]
const fn u64_to_f64_01(x: u64) -> f64 {
    (x >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
