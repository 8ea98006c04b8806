//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Injectable jitter sources for the physics step."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use ctsim_common::config::JitterRange;
use rand::prelude::*;

/// Source of the bounded jitter applied on every tick.
pub trait NoiseSource {
    /// Draw a value from `range`, bounds inclusive.
    fn sample(&mut self, range: JitterRange) -> f64;
}

impl<N: NoiseSource + ?Sized> NoiseSource for &mut N {
    fn sample(&mut self, range: JitterRange) -> f64 {
        (**self).sample(range)
    }
}

/// Uniform jitter from a seeded generator; equal seeds give equal sequences.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    seed: u64,
    rng: StdRng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick a fresh seed; log [`SeededNoise::seed`] to reproduce the run.
    pub fn from_entropy() -> Self {
        Self::new(thread_rng().gen())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl NoiseSource for SeededNoise {
    fn sample(&mut self, range: JitterRange) -> f64 {
        if range.low >= range.high {
            return range.low;
        }
        self.rng.gen_range(range.low..=range.high)
    }
}

/// Always returns the same relative position inside each range.
///
/// `ConstantNoise::midpoint()` removes randomness entirely, which makes
/// per-tick values exactly predictable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantNoise {
    fraction: f64,
}

impl ConstantNoise {
    /// `fraction` is clamped to `[0, 1]`; 0 selects the low bound.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    pub fn midpoint() -> Self {
        Self::new(0.5)
    }
}

impl NoiseSource for ConstantNoise {
    fn sample(&mut self, range: JitterRange) -> f64 {
        range.low + (range.high - range.low) * self.fraction
    }
}
