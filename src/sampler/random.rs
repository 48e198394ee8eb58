//! Random sampler implementation.

use parking_lot::Mutex;

use crate::distribution::Distribution;
use crate::frozen::FrozenTrial;
use crate::rng_util;
use crate::sampler::{Sampler, snap_to_domain};
use crate::types::Direction;

/// A sampler that ignores history and draws uniformly from the domain.
///
/// Log-uniform parameters are drawn uniformly in log space, quantized ones
/// uniformly over their grid points and categorical ones uniformly over the
/// choice indices. It is the baseline strategy and the startup phase of
/// [`TpeSampler`](super::tpe::TpeSampler).
///
/// # Examples
///
/// ```
/// use hyperstudy::sampler::random::RandomSampler;
///
/// // Create with default RNG
/// let sampler = RandomSampler::new();
///
/// // Create with a fixed seed for reproducibility
/// let sampler = RandomSampler::with_seed(42);
/// ```
pub struct RandomSampler {
    rng: Mutex<fastrand::Rng>,
}

impl RandomSampler {
    /// Creates a new random sampler with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random sampler with a fixed seed for reproducibility.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    /// Draws an internal value without consulting any history.
    pub(crate) fn draw(&self, distribution: &Distribution) -> f64 {
        if let Some(value) = distribution.single_value() {
            return value;
        }
        draw_from(&mut self.rng.lock(), distribution)
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_precision_loss)]
fn draw_from(rng: &mut fastrand::Rng, distribution: &Distribution) -> f64 {
    let raw = match distribution {
        Distribution::Uniform(d) => rng_util::f64_range(rng, d.low, d.high),
        Distribution::LogUniform(d) => rng_util::f64_range(rng, d.low.ln(), d.high.ln()).exp(),
        Distribution::IntUniform(d) => rng.i64(d.low..=d.high) as f64,
        Distribution::DiscreteUniform(d) => {
            let k = rng.i64(0..=d.max_index());
            d.low + k as f64 * d.q
        }
        Distribution::Categorical(d) => rng.usize(0..d.choices.len()) as f64,
    };
    snap_to_domain(distribution, raw)
}

impl Sampler for RandomSampler {
    fn sample(
        &self,
        _direction: Direction,
        _trial: &FrozenTrial,
        _param_name: &str,
        distribution: &Distribution,
        _history: &[FrozenTrial],
    ) -> f64 {
        self.draw(distribution)
    }
}
