//! Median pruner: prune trials that fall below the median at the same step.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `n_startup_trials` | 5 | Completed trials required before anything is pruned |
//! | `n_warmup_steps` | 0 | Never prune before this step |
//! | `n_min_trials` | 1 | Completed trials that must have reported at the step |
//!
//! # Example
//!
//! ```
//! use hyperstudy::prelude::*;
//!
//! let study = Study::builder()
//!     .minimize()
//!     .pruner(MedianPruner::new().n_startup_trials(3).n_warmup_steps(2))
//!     .build()
//!     .unwrap();
//! ```

use super::Pruner;
use super::percentile::PercentilePruner;
use crate::frozen::FrozenTrial;
use crate::types::Direction;

/// Prunes a trial whose latest intermediate value is worse than the median
/// of the completed trials' values at the same step.
#[derive(Clone, Debug)]
pub struct MedianPruner {
    inner: PercentilePruner,
}

impl MedianPruner {
    /// Creates a median pruner with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PercentilePruner::new(50.0),
        }
    }

    /// Completed trials the study needs before pruning starts.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.inner = self.inner.n_startup_trials(n);
        self
    }

    /// Steps below this are never pruned.
    #[must_use]
    pub fn n_warmup_steps(mut self, n: u64) -> Self {
        self.inner = self.inner.n_warmup_steps(n);
        self
    }

    /// Completed trials that must have reported at the step being judged.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub fn n_min_trials(mut self, n: usize) -> Self {
        self.inner = self.inner.n_min_trials(n);
        self
    }
}

impl Default for MedianPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner for MedianPruner {
    fn should_prune(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        history: &[FrozenTrial],
    ) -> bool {
        self.inner.should_prune(direction, trial, history)
    }
}
