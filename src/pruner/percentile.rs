//! Percentile pruner: prune trials outside the top N% at each step.
//!
//! At the trial's latest step, its intermediate value is compared against the
//! given percentile of the values that completed trials reported at the same
//! step. Lower percentiles prune more aggressively; 50 is the
//! [`MedianPruner`](super::MedianPruner).
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `percentile` | *(required)* | Keep trials in the top N%, range `(0, 100)` |
//! | `n_startup_trials` | 5 | Completed trials required before anything is pruned |
//! | `n_warmup_steps` | 0 | Never prune before this step |
//! | `n_min_trials` | 1 | Completed trials that must have reported at the step |
//!
//! # Example
//!
//! ```
//! use hyperstudy::pruner::PercentilePruner;
//!
//! // Keep only the top 25% of trials (aggressive pruning)
//! let pruner = PercentilePruner::new(25.0)
//!     .n_warmup_steps(5)
//!     .n_min_trials(3);
//! ```

use super::{Pruner, complete_values_at, is_worse};
use crate::frozen::FrozenTrial;
use crate::types::{Direction, TrialState};

/// Prunes a trial whose latest value is worse than a percentile of its
/// completed siblings at the same step.
#[derive(Clone, Debug)]
pub struct PercentilePruner {
    percentile: f64,
    n_startup_trials: usize,
    n_warmup_steps: u64,
    n_min_trials: usize,
}

impl PercentilePruner {
    /// Creates a pruner keeping the top `percentile` percent.
    ///
    /// # Panics
    ///
    /// Panics if `percentile` is not in `(0.0, 100.0)`.
    #[must_use]
    pub fn new(percentile: f64) -> Self {
        assert!(
            percentile > 0.0 && percentile < 100.0,
            "percentile must be in (0.0, 100.0), got {percentile}"
        );
        Self {
            percentile,
            n_startup_trials: 5,
            n_warmup_steps: 0,
            n_min_trials: 1,
        }
    }

    /// Completed trials the study needs before pruning starts.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Steps below this are never pruned.
    #[must_use]
    pub fn n_warmup_steps(mut self, n: u64) -> Self {
        self.n_warmup_steps = n;
        self
    }

    /// Completed trials that must have reported at the step being judged.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub fn n_min_trials(mut self, n: usize) -> Self {
        assert!(n >= 1, "n_min_trials must be >= 1, got {n}");
        self.n_min_trials = n;
        self
    }
}

impl Pruner for PercentilePruner {
    fn should_prune(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        history: &[FrozenTrial],
    ) -> bool {
        let (Some(step), Some(current)) = (trial.last_step(), trial.last_intermediate_value())
        else {
            return false;
        };
        if step < self.n_warmup_steps {
            return false;
        }
        let n_complete = history
            .iter()
            .filter(|t| t.id != trial.id && t.state == TrialState::Complete)
            .count();
        if n_complete < self.n_startup_trials {
            return false;
        }
        if current.is_nan() {
            return true;
        }

        let mut values = complete_values_at(trial, history, step);
        if values.len() < self.n_min_trials {
            return false;
        }

        // Percentile of the *best* values: flip the ranking for maximize.
        let percentile = match direction {
            Direction::Minimize => self.percentile,
            Direction::Maximize => 100.0 - self.percentile,
        };
        let threshold = compute_percentile(&mut values, percentile);
        is_worse(direction, current, threshold)
    }
}

/// Linear-interpolated percentile of `values` (sorted in place).
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn compute_percentile(values: &mut [f64], percentile: f64) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let len = values.len();
    if len <= 1 {
        return values.first().copied().unwrap_or(f64::NAN);
    }
    let rank = percentile / 100.0 * (len - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let frac = rank - lower as f64;
        values[lower] * (1.0 - frac) + values[upper] * frac
    }
}
