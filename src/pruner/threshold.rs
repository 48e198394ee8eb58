//! Threshold pruner: prune values outside fixed bounds.
//!
//! Unlike the comparative pruners this one ignores sibling trials; it is
//! useful for cutting off diverging runs (e.g. a loss that exploded).
//!
//! ```
//! use hyperstudy::pruner::ThresholdPruner;
//!
//! let pruner = ThresholdPruner::new().upper(100.0).n_warmup_steps(2);
//! ```

use super::Pruner;
use crate::frozen::FrozenTrial;
use crate::types::Direction;

/// Prunes a trial whose latest intermediate value is NaN or lies outside
/// `[lower, upper]`.
#[derive(Clone, Debug)]
pub struct ThresholdPruner {
    lower: Option<f64>,
    upper: Option<f64>,
    n_warmup_steps: u64,
}

impl ThresholdPruner {
    /// A pruner with no bounds; only NaN values are pruned.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lower: None,
            upper: None,
            n_warmup_steps: 0,
        }
    }

    /// Prune values below `lower`.
    #[must_use]
    pub fn lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Prune values above `upper`.
    #[must_use]
    pub fn upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Steps below this are never pruned.
    #[must_use]
    pub fn n_warmup_steps(mut self, n: u64) -> Self {
        self.n_warmup_steps = n;
        self
    }
}

impl Default for ThresholdPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner for ThresholdPruner {
    fn should_prune(
        &self,
        _direction: Direction,
        trial: &FrozenTrial,
        _history: &[FrozenTrial],
    ) -> bool {
        let (Some(step), Some(value)) = (trial.last_step(), trial.last_intermediate_value()) else {
            return false;
        };
        if step < self.n_warmup_steps {
            return false;
        }
        value.is_nan()
            || self.lower.is_some_and(|lo| value < lo)
            || self.upper.is_some_and(|hi| value > hi)
    }
}
