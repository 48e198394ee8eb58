//! One-dimensional Parzen estimators over observed parameter values.
//!
//! A [`ParzenEstimator`] is a mixture of truncated Gaussians, one per
//! observation plus an optional wide prior component centred on the domain.
//! Each kernel's bandwidth comes from the distance to its neighbours.

use rand::Rng;

use crate::rng_util::standard_normal;

/// Observations after which [`default_weights`] starts down-weighting old ones.
const FLAT_WEIGHT_WINDOW: usize = 25;

/// Rejection-sampling attempts before falling back to the kernel centre.
const MAX_REJECTIONS: usize = 100;

/// Knobs shared by continuous and categorical estimators.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ParzenConfig {
    pub(crate) prior_weight: f64,
    pub(crate) consider_prior: bool,
    pub(crate) consider_magic_clip: bool,
    pub(crate) consider_endpoints: bool,
}

/// Weights for `n` observations ordered oldest first.
///
/// The newest 25 get weight 1; older ones ramp linearly from `1/n` up to 1.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn default_weights(n: usize) -> Vec<f64> {
    if n < FLAT_WEIGHT_WINDOW {
        return vec![1.0; n];
    }
    let ramp_len = n - FLAT_WEIGHT_WINDOW;
    let start = 1.0 / n as f64;
    let ramp = (0..ramp_len).map(|i| {
        if ramp_len == 1 {
            start
        } else {
            start + (1.0 - start) * i as f64 / (ramp_len - 1) as f64
        }
    });
    ramp.chain(core::iter::repeat_n(1.0, FLAT_WEIGHT_WINDOW))
        .collect()
}

/// Normalized probabilities over `n_choices` from observed choice indices.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn categorical_pmf(indices: &[usize], n_choices: usize, config: ParzenConfig) -> Vec<f64> {
    let mut counts = vec![0.0; n_choices];
    for (&idx, w) in indices.iter().zip(default_weights(indices.len())) {
        if let Some(c) = counts.get_mut(idx) {
            *c += w;
        }
    }
    let total: f64 = counts.iter().sum();
    if config.consider_prior || total <= 0.0 {
        for c in &mut counts {
            *c += config.prior_weight.max(f64::MIN_POSITIVE);
        }
    }
    let total: f64 = counts.iter().sum();
    counts.iter().map(|c| c / total).collect()
}

/// A mixture of Gaussians truncated to `[low, high]`.
#[derive(Clone, Debug)]
pub(crate) struct ParzenEstimator {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    weights: Vec<f64>,
    low: f64,
    high: f64,
}

impl ParzenEstimator {
    /// Builds an estimator from observations ordered oldest first.
    ///
    /// Requires `low < high`. With no observations the prior component is
    /// always added so the mixture is never empty.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn new(observations: &[f64], low: f64, high: f64, config: ParzenConfig) -> Self {
        let mut components: Vec<(f64, f64, bool)> = observations
            .iter()
            .zip(default_weights(observations.len()))
            .map(|(&mu, w)| (mu, w, false))
            .collect();
        if config.consider_prior || components.is_empty() {
            components.push((0.5 * (low + high), config.prior_weight, true));
        }
        components.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = components.len();
        let mus: Vec<f64> = components.iter().map(|c| c.0).collect();
        let mut sigmas: Vec<f64> = (0..n)
            .map(|i| {
                let left = if i == 0 { low } else { mus[i - 1] };
                let right = if i + 1 == n { high } else { mus[i + 1] };
                (mus[i] - left).max(right - mus[i])
            })
            .collect();
        if !config.consider_endpoints && n >= 2 {
            sigmas[0] = mus[1] - mus[0];
            sigmas[n - 1] = mus[n - 1] - mus[n - 2];
        }

        let max_sigma = high - low;
        let min_sigma = if config.consider_magic_clip {
            max_sigma / (1 + observations.len()).min(100) as f64
        } else {
            f64::EPSILON
        };
        for (sigma, component) in sigmas.iter_mut().zip(&components) {
            *sigma = if component.2 {
                max_sigma
            } else {
                sigma.max(min_sigma).min(max_sigma)
            };
        }

        let total: f64 = components.iter().map(|c| c.1).sum();
        let weights = if total > 0.0 {
            components.iter().map(|c| c.1 / total).collect()
        } else {
            vec![1.0 / n as f64; n]
        };

        Self {
            mus,
            sigmas,
            weights,
            low,
            high,
        }
    }

    /// Draws one value inside `[low, high]`.
    pub(crate) fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let i = self.pick_component(rng.random::<f64>());
        let (mu, sigma) = (self.mus[i], self.sigmas[i]);
        for _ in 0..MAX_REJECTIONS {
            let x = mu + sigma * standard_normal(rng);
            if (self.low..=self.high).contains(&x) {
                return x;
            }
        }
        mu.clamp(self.low, self.high)
    }

    /// Natural log of the mixture density at `x`.
    pub(crate) fn log_pdf(&self, x: f64) -> f64 {
        let density: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .zip(&self.weights)
            .map(|((&mu, &sigma), &w)| {
                let mass = normal_cdf((self.high - mu) / sigma) - normal_cdf((self.low - mu) / sigma);
                w * normal_pdf((x - mu) / sigma) / (sigma * mass.max(f64::MIN_POSITIVE))
            })
            .sum();
        density.max(f64::MIN_POSITIVE).ln()
    }

    fn pick_component(&self, u: f64) -> usize {
        let mut cumulative = 0.0;
        for (i, &w) in self.weights.iter().enumerate() {
            cumulative += w;
            if u < cumulative {
                return i;
            }
        }
        self.weights.len() - 1
    }
}

fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * core::f64::consts::PI).sqrt()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / core::f64::consts::SQRT_2))
}

/// Abramowitz-Stegun 7.1.26, max error 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
