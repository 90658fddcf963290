//! The single random stream of a simulation.
//!
//! Every stochastic decision in a [`World`](crate::world::World) draws from one
//! [`RandomSource`], in a fixed call order per behavior, so a fixed seed
//! reproduces a whole run.

use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Poisson;
use serde::{Deserialize, Serialize};

/// Seedable uniform generator.
///
/// Implements [`RngCore`] so `rand_distr` distributions can sample from the
/// same stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomSource {
    rng: ChaCha12Rng,
}

impl RandomSource {
    /// Create a source with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the operating system.
    pub fn from_os_rng() -> Result<Self> {
        let rng = ChaCha12Rng::try_from_os_rng().context("failed to seed from os rng")?;
        Ok(Self { rng })
    }

    /// Reset the stream deterministically.
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha12Rng::seed_from_u64(seed);
    }

    /// Draw a uniform number in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.rng.fill_bytes(dst);
    }
}

/// Scheme used to draw the number of humans seeded per cell.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingSampler {
    /// Standard Poisson sampler from `rand_distr`.
    #[default]
    Poisson,
    /// One uniform draw `u`, counting up `k` while `u < P(rate, k)`.
    ///
    /// Not a Poisson sampler: with `rate = 2` it returns zero about 86% of the
    /// time. Kept to reproduce the historical seeding density.
    Threshold,
}

/// Draws per-cell resident counts with a fixed mean.
#[derive(Debug)]
pub struct ResidentSampler {
    rate: f64,
    kind: SeedingSampler,
    poisson: Option<Poisson<f64>>,
}

impl ResidentSampler {
    /// Sampler of the given kind with mean `rate`.
    pub fn new(kind: SeedingSampler, rate: f64) -> Result<Self> {
        let poisson = if kind == SeedingSampler::Poisson && rate > 0.0 {
            Some(Poisson::new(rate).context("failed to construct poisson distribution")?)
        } else {
            None
        };
        Ok(Self {
            rate,
            kind,
            poisson,
        })
    }

    /// Draw the number of residents of one cell.
    pub fn sample(&self, rng: &mut RandomSource) -> usize {
        match self.kind {
            SeedingSampler::Poisson => match &self.poisson {
                Some(dist) => dist.sample(rng) as usize,
                None => 0,
            },
            SeedingSampler::Threshold => sample_threshold(self.rate, rng),
        }
    }
}

/// Probability of `k` events for a Poisson process with the given rate.
pub fn poisson_probability(rate: f64, k: u32) -> f64 {
    // Iterative product avoids the factorial overflowing.
    let mut prob = (-rate).exp();
    for i in 1..=k {
        prob *= rate / f64::from(i);
    }
    prob
}

fn sample_threshold(rate: f64, rng: &mut RandomSource) -> usize {
    let sample = rng.next();
    let mut k = 0;
    // Terminates once the probability mass underflows below `sample`.
    while sample < poisson_probability(rate, k) {
        k += 1;
    }
    k as usize
}
