//! Successive halving: budget-aware pruning at exponentially spaced rungs.
//!
//! A rung is a checkpoint step. At each rung only the best `1/η` of the
//! trials that reached it may continue. With `min_resource=1`,
//! `max_resource=81` and `reduction_factor=3`:
//!
//! | Rung | Step | Survivors |
//! |------|------|-----------|
//! | 0 | 1 | top 1/3 |
//! | 1 | 3 | top 1/3 |
//! | 2 | 9 | top 1/3 |
//! | 3 | 27 | top 1/3 |
//! | 4 | 81 | all (full budget) |
//!
//! Siblings that were themselves pruned still count: they reached the rung
//! and their value there is a fair comparison.
//!
//! # Example
//!
//! ```
//! use hyperstudy::pruner::SuccessiveHalvingPruner;
//!
//! let pruner = SuccessiveHalvingPruner::new()
//!     .min_resource(1)
//!     .max_resource(81)
//!     .reduction_factor(3);
//! ```

use super::{Pruner, is_worse};
use crate::frozen::FrozenTrial;
use crate::types::{Direction, TrialState};

/// Prunes trials outside the top `1/reduction_factor` at each rung.
#[derive(Clone, Debug)]
pub struct SuccessiveHalvingPruner {
    min_resource: u64,
    max_resource: u64,
    reduction_factor: u64,
    min_early_stopping_rate: u64,
}

impl SuccessiveHalvingPruner {
    /// Defaults: `min_resource=1`, `max_resource=81`, `reduction_factor=3`,
    /// `min_early_stopping_rate=0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_resource: 1,
            max_resource: 81,
            reduction_factor: 3,
            min_early_stopping_rate: 0,
        }
    }

    /// Step of the first rung.
    ///
    /// # Panics
    ///
    /// Panics if `r` is 0.
    #[must_use]
    pub fn min_resource(mut self, r: u64) -> Self {
        assert!(r > 0, "min_resource must be > 0, got {r}");
        self.min_resource = r;
        self
    }

    /// Full budget; trials at this rung are never pruned.
    ///
    /// # Panics
    ///
    /// Panics if `r` is 0.
    #[must_use]
    pub fn max_resource(mut self, r: u64) -> Self {
        assert!(r > 0, "max_resource must be > 0, got {r}");
        self.max_resource = r;
        self
    }

    /// The `η` in "keep the top `1/η`".
    ///
    /// # Panics
    ///
    /// Panics if `eta` is less than 2.
    #[must_use]
    pub fn reduction_factor(mut self, eta: u64) -> Self {
        assert!(eta >= 2, "reduction_factor must be >= 2, got {eta}");
        self.reduction_factor = eta;
        self
    }

    /// Skip the first `n` rungs.
    #[must_use]
    pub fn min_early_stopping_rate(mut self, n: u64) -> Self {
        self.min_early_stopping_rate = n;
        self
    }

    /// `min_resource * η^k` for every rung `k` up to `max_resource`.
    fn rung_steps(&self) -> Vec<u64> {
        let eta = self.reduction_factor;
        let mut steps = Vec::new();
        let mut rung: u32 = 0;
        while let Some(power) = eta.checked_pow(rung) {
            let step = self.min_resource.saturating_mul(power);
            if step > self.max_resource {
                break;
            }
            if u64::from(rung) >= self.min_early_stopping_rate {
                steps.push(step);
            }
            rung += 1;
        }
        steps
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn is_pruned_at_rung(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        current: f64,
        rung_step: u64,
        history: &[FrozenTrial],
    ) -> bool {
        let eta = usize::try_from(self.reduction_factor).unwrap_or(usize::MAX);
        let mut values: Vec<f64> = history
            .iter()
            .filter(|t| t.id != trial.id)
            .filter(|t| matches!(t.state, TrialState::Complete | TrialState::Pruned))
            .filter_map(|t| t.intermediate_values.get(&rung_step).copied())
            .filter(|v| v.is_finite())
            .collect();

        // Fewer than η siblings cannot define a top 1/η.
        if values.len() < eta {
            return false;
        }
        if current.is_nan() {
            return true;
        }

        values.push(current);
        values.sort_unstable_by(|a, b| direction.rank(*a, *b));
        let n_keep = (values.len() as f64 / eta as f64).ceil() as usize;
        let threshold = values[n_keep.max(1) - 1];
        is_worse(direction, current, threshold)
    }
}

impl Default for SuccessiveHalvingPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner for SuccessiveHalvingPruner {
    fn should_prune(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        history: &[FrozenTrial],
    ) -> bool {
        let Some(step) = trial.last_step() else {
            return false;
        };
        let Some(&rung_step) = self.rung_steps().iter().rev().find(|&&r| r <= step) else {
            return false;
        };
        if rung_step >= self.max_resource {
            return false;
        }
        // The value at the rung, or the latest one reported before it.
        let Some((_, &current)) = trial.intermediate_values.range(..=rung_step).next_back() else {
            return false;
        };
        self.is_pruned_at_rung(direction, trial, current, rung_step, history)
    }
}
