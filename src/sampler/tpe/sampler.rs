//! Tree-structured Parzen Estimator (TPE) sampler.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::frozen::FrozenTrial;
use crate::kde::{ParzenConfig, ParzenEstimator, categorical_pmf};
use crate::sampler::random::RandomSampler;
use crate::sampler::tpe::gamma::{DefaultGamma, FixedGamma, GammaStrategy};
use crate::sampler::{Sampler, recorded_value, snap_to_domain};
use crate::types::{Direction, TrialState};

/// A Tree-structured Parzen Estimator sampler.
///
/// Complete trials that recorded the requested parameter are ranked under the
/// study direction and split into a *good* set (the top
/// [`GammaStrategy::gamma`] trials) and the rest. A Parzen estimator is fitted
/// to each set; `n_ei_candidates` draws from the good estimator are scored by
/// `l(x) / g(x)` and the best one wins. Until `n_startup_trials` such trials
/// exist the sampler draws at random.
///
/// Only trials that actually used the parameter take part, so parameters that
/// are suggested conditionally are modelled from the trials that reached them.
///
/// # Examples
///
/// ```
/// use hyperstudy::sampler::tpe::TpeSampler;
///
/// // Create with default settings
/// let sampler = TpeSampler::new();
///
/// // Create with custom settings using the builder
/// let sampler = TpeSampler::builder()
///     .gamma(0.15)
///     .n_startup_trials(20)
///     .n_ei_candidates(32)
///     .seed(42)
///     .build()
///     .unwrap();
/// ```
pub struct TpeSampler {
    gamma_strategy: Arc<dyn GammaStrategy>,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    parzen: ParzenConfig,
    rng: Mutex<StdRng>,
    random: RandomSampler,
}

impl TpeSampler {
    /// Creates a new TPE sampler with default settings.
    ///
    /// Default settings:
    /// - gamma strategy: [`DefaultGamma`]
    /// - `n_startup_trials`: 10
    /// - `n_ei_candidates`: 24
    /// - `prior_weight`: 1.0, with the prior and the magic clip enabled
    #[must_use]
    pub fn new() -> Self {
        TpeSamplerBuilder::new().finish(StdRng::from_os_rng(), RandomSampler::new())
    }

    /// Creates a builder for configuring a TPE sampler.
    #[must_use]
    pub fn builder() -> TpeSamplerBuilder {
        TpeSamplerBuilder::new()
    }

    /// The configured gamma strategy.
    #[must_use]
    pub fn gamma_strategy(&self) -> &dyn GammaStrategy {
        self.gamma_strategy.as_ref()
    }

    /// Ranks the observations and splits them into good and other values.
    ///
    /// Both halves keep trial-number order so that older observations get
    /// the lower weights.
    fn split_observations(
        &self,
        direction: Direction,
        mut obs: Vec<(u64, f64, f64)>,
    ) -> (Vec<f64>, Vec<f64>) {
        let n = obs.len();
        let n_good = self.gamma_strategy.gamma(n).clamp(1, n);

        obs.sort_by(|a, b| direction.rank(a.1, b.1).then(a.0.cmp(&b.0)));
        let mut good: Vec<(u64, f64)> = obs[..n_good].iter().map(|o| (o.0, o.2)).collect();
        let mut other: Vec<(u64, f64)> = obs[n_good..].iter().map(|o| (o.0, o.2)).collect();
        good.sort_by_key(|o| o.0);
        other.sort_by_key(|o| o.0);
        (
            good.into_iter().map(|o| o.1).collect(),
            other.into_iter().map(|o| o.1).collect(),
        )
    }

    /// Returns the best of `n_ei_candidates` draws from the good estimator,
    /// in the estimators' own space.
    fn sample_numeric(&self, good: &[f64], other: &[f64], low: f64, high: f64) -> f64 {
        let l = ParzenEstimator::new(good, low, high, self.parzen);
        let g = ParzenEstimator::new(other, low, high, self.parzen);
        let mut rng = self.rng.lock();

        let mut best = (f64::NEG_INFINITY, 0.5 * (low + high));
        for _ in 0..self.n_ei_candidates.max(1) {
            let x = l.sample(&mut *rng);
            let score = l.log_pdf(x) - g.log_pdf(x);
            if score > best.0 {
                best = (score, x);
            }
        }
        best.1
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn sample_categorical(&self, good: &[f64], other: &[f64], n_choices: usize) -> f64 {
        let to_indices = |values: &[f64]| -> Vec<usize> {
            values.iter().map(|v| v.round().max(0.0) as usize).collect()
        };
        let l = categorical_pmf(&to_indices(good), n_choices, self.parzen);
        let g = categorical_pmf(&to_indices(other), n_choices, self.parzen);
        let mut rng = self.rng.lock();

        let mut best = (f64::NEG_INFINITY, 0);
        for _ in 0..self.n_ei_candidates.max(1) {
            let idx = pick_index(&l, rng.random::<f64>());
            let score = l[idx].ln() - g[idx].ln();
            if score > best.0 {
                best = (score, idx);
            }
        }
        best.1 as f64
    }
}

fn pick_index(pmf: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &p) in pmf.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    pmf.len().saturating_sub(1)
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for TpeSampler {
    #[allow(clippy::cast_precision_loss)]
    fn sample(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        param_name: &str,
        distribution: &Distribution,
        history: &[FrozenTrial],
    ) -> f64 {
        if let Some(value) = distribution.single_value() {
            return value;
        }

        let observations: Vec<(u64, f64, f64)> = history
            .iter()
            .filter(|t| t.id != trial.id && t.state == TrialState::Complete)
            .filter_map(|t| {
                let score = t.value.filter(|v| v.is_finite())?;
                let value = recorded_value(t, param_name, distribution)?;
                Some((t.number, score, value))
            })
            .collect();

        if observations.len() < self.n_startup_trials.max(1) {
            trace_debug!(
                param = param_name,
                n_observations = observations.len(),
                "TPE startup phase, sampling at random"
            );
            return self.random.draw(distribution);
        }

        let (good, other) = self.split_observations(direction, observations);
        let raw = match distribution {
            Distribution::Uniform(d) => self.sample_numeric(&good, &other, d.low, d.high),
            Distribution::LogUniform(d) => {
                let ln = |v: &[f64]| -> Vec<f64> { v.iter().map(|x| x.ln()).collect() };
                self.sample_numeric(&ln(&good), &ln(&other), d.low.ln(), d.high.ln())
                    .exp()
            }
            Distribution::IntUniform(d) => self.sample_numeric(
                &good,
                &other,
                d.low as f64 - 0.5,
                d.high as f64 + 0.5,
            ),
            Distribution::DiscreteUniform(d) => {
                let half = 0.5 * d.q;
                self.sample_numeric(&good, &other, d.low - half, d.high + half)
            }
            Distribution::Categorical(d) => {
                self.sample_categorical(&good, &other, d.choices.len())
            }
        };
        snap_to_domain(distribution, raw)
    }
}

/// Builder for [`TpeSampler`].
#[derive(Debug, Clone)]
pub struct TpeSamplerBuilder {
    gamma_strategy: Option<Arc<dyn GammaStrategy>>,
    raw_gamma: Option<f64>,
    n_startup_trials: usize,
    n_ei_candidates: usize,
    parzen: ParzenConfig,
    seed: Option<u64>,
}

impl TpeSamplerBuilder {
    /// Starts from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gamma_strategy: None,
            raw_gamma: None,
            n_startup_trials: 10,
            n_ei_candidates: 24,
            parzen: ParzenConfig {
                prior_weight: 1.0,
                consider_prior: true,
                consider_magic_clip: true,
                consider_endpoints: false,
            },
            seed: None,
        }
    }

    /// Uses a [`FixedGamma`] with this fraction (validated in [`build`](Self::build)).
    #[must_use]
    pub fn gamma(mut self, fraction: f64) -> Self {
        self.raw_gamma = Some(fraction);
        self.gamma_strategy = None;
        self
    }

    /// Uses a custom gamma strategy.
    #[must_use]
    pub fn gamma_strategy<G: GammaStrategy + 'static>(mut self, strategy: G) -> Self {
        self.gamma_strategy = Some(Arc::new(strategy));
        self.raw_gamma = None;
        self
    }

    /// Complete trials required before the density model is used.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Candidates drawn from the good estimator per suggestion.
    #[must_use]
    pub fn n_ei_candidates(mut self, n: usize) -> Self {
        self.n_ei_candidates = n;
        self
    }

    /// Weight of the prior component relative to one observation.
    #[must_use]
    pub fn prior_weight(mut self, weight: f64) -> Self {
        self.parzen.prior_weight = weight;
        self
    }

    /// Whether to mix a wide prior into both estimators.
    #[must_use]
    pub fn consider_prior(mut self, yes: bool) -> Self {
        self.parzen.consider_prior = yes;
        self
    }

    /// Whether to floor kernel bandwidths at `range / min(100, n + 1)`.
    #[must_use]
    pub fn consider_magic_clip(mut self, yes: bool) -> Self {
        self.parzen.consider_magic_clip = yes;
        self
    }

    /// Whether the domain bounds count as neighbours of the outermost kernels.
    #[must_use]
    pub fn consider_endpoints(mut self, yes: bool) -> Self {
        self.parzen.consider_endpoints = yes;
        self
    }

    /// Seeds both the model RNG and the startup random sampler.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration and builds the sampler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGamma`] for a fraction outside `(0.0, 1.0]`
    /// and [`Error::InvalidPriorWeight`] for a prior weight that is negative
    /// or not finite.
    pub fn build(mut self) -> Result<TpeSampler> {
        if let Some(fraction) = self.raw_gamma.take() {
            self.gamma_strategy = Some(Arc::new(FixedGamma::new(fraction)?));
        }
        let w = self.parzen.prior_weight;
        if !(w >= 0.0 && w.is_finite()) {
            return Err(Error::InvalidPriorWeight(w));
        }
        let (rng, random) = match self.seed {
            Some(s) => (StdRng::seed_from_u64(s), RandomSampler::with_seed(s)),
            None => (StdRng::from_os_rng(), RandomSampler::new()),
        };
        Ok(self.finish(rng, random))
    }

    fn finish(self, rng: StdRng, random: RandomSampler) -> TpeSampler {
        TpeSampler {
            gamma_strategy: self
                .gamma_strategy
                .unwrap_or_else(|| Arc::new(DefaultGamma)),
            n_startup_trials: self.n_startup_trials,
            n_ei_candidates: self.n_ei_candidates,
            parzen: self.parzen,
            rng: Mutex::new(rng),
            random,
        }
    }
}

impl Default for TpeSamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
