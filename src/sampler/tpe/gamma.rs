use core::fmt::Debug;

use crate::Error;

/// Decides how many of the ranked trials count as "good".
///
/// The sampler clamps the result into `1..=n_trials`, so strategies may
/// return 0 or overshoot without harm.
///
/// # Examples
///
/// ```
/// use hyperstudy::sampler::tpe::GammaStrategy;
///
/// #[derive(Debug)]
/// struct TopThree;
///
/// impl GammaStrategy for TopThree {
///     fn gamma(&self, _n_trials: usize) -> usize {
///         3
///     }
/// }
/// ```
pub trait GammaStrategy: Send + Sync + Debug {
    /// The number of good trials out of `n_trials` ranked observations.
    fn gamma(&self, n_trials: usize) -> usize;
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ceil_count(x: f64) -> usize {
    x.ceil().max(0.0) as usize
}

/// `min(ceil(0.1 * n), 25)`: a tenth of the trials, capped.
///
/// This is the default strategy of [`TpeSampler`](super::TpeSampler).
///
/// ```
/// use hyperstudy::sampler::tpe::{DefaultGamma, GammaStrategy};
///
/// assert_eq!(DefaultGamma.gamma(9), 1);
/// assert_eq!(DefaultGamma.gamma(11), 2);
/// assert_eq!(DefaultGamma.gamma(1000), 25);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGamma;

impl GammaStrategy for DefaultGamma {
    #[allow(clippy::cast_precision_loss)]
    fn gamma(&self, n_trials: usize) -> usize {
        ceil_count(0.1 * n_trials as f64).min(25)
    }
}

/// A constant fraction of the trials, rounded up.
///
/// ```
/// use hyperstudy::sampler::tpe::{FixedGamma, GammaStrategy};
///
/// let strategy = FixedGamma::new(0.25).unwrap();
/// assert_eq!(strategy.gamma(10), 3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedGamma {
    fraction: f64,
}

impl FixedGamma {
    /// Creates a fixed-fraction strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGamma`] unless `fraction` is in `(0.0, 1.0]`.
    pub fn new(fraction: f64) -> crate::Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(Error::InvalidGamma(fraction));
        }
        Ok(Self { fraction })
    }

    /// The configured fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl GammaStrategy for FixedGamma {
    #[allow(clippy::cast_precision_loss)]
    fn gamma(&self, n_trials: usize) -> usize {
        ceil_count(self.fraction * n_trials as f64)
    }
}

/// `min(ceil(factor * sqrt(n)), cap)`, the Hyperopt rule.
///
/// Grows slower than [`DefaultGamma`], so the good set stays small and the
/// search stays exploitative for long studies.
///
/// ```
/// use hyperstudy::sampler::tpe::{GammaStrategy, SqrtGamma};
///
/// let strategy = SqrtGamma::default();
/// assert_eq!(strategy.gamma(100), 3);
/// assert!(strategy.gamma(10_000) <= 25);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SqrtGamma {
    factor: f64,
    cap: usize,
}

impl SqrtGamma {
    /// Creates a square-root strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGamma`] if `factor` is not positive.
    pub fn new(factor: f64, cap: usize) -> crate::Result<Self> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::InvalidGamma(factor));
        }
        Ok(Self { factor, cap })
    }
}

impl Default for SqrtGamma {
    /// `factor = 0.25`, `cap = 25`.
    fn default() -> Self {
        Self {
            factor: 0.25,
            cap: 25,
        }
    }
}

impl GammaStrategy for SqrtGamma {
    #[allow(clippy::cast_precision_loss)]
    fn gamma(&self, n_trials: usize) -> usize {
        ceil_count(self.factor * (n_trials as f64).sqrt()).min(self.cap)
    }
}
