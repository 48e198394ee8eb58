//! Pruner trait and implementations for trial pruning.
//!
//! Pruners decide whether a running trial is worth continuing, by comparing
//! the intermediate values it reported so far against its siblings. Pruning
//! is advisory: [`Trial::should_prune`](crate::Trial::should_prune) returns
//! the verdict and the objective decides whether to stop (usually by
//! returning [`TrialPruned`](crate::TrialPruned)).

mod median;
mod nop;
mod percentile;
mod successive_halving;
mod threshold;

pub use median::MedianPruner;
pub use nop::NopPruner;
pub use percentile::PercentilePruner;
pub use successive_halving::SuccessiveHalvingPruner;
pub use threshold::ThresholdPruner;

use crate::frozen::FrozenTrial;
use crate::types::{Direction, TrialState};

/// Trait for pluggable trial pruning strategies.
///
/// `trial` is a fresh snapshot of the running trial, including every
/// intermediate value reported so far; `history` holds the study's other
/// trials. The trait requires `Send + Sync` because one pruner serves every
/// worker of a study.
///
/// # Implementing a custom pruner
///
/// ```
/// use hyperstudy::pruner::Pruner;
/// use hyperstudy::{Direction, FrozenTrial};
///
/// struct MyPruner {
///     threshold: f64,
/// }
///
/// impl Pruner for MyPruner {
///     fn should_prune(
///         &self,
///         _direction: Direction,
///         trial: &FrozenTrial,
///         _history: &[FrozenTrial],
///     ) -> bool {
///         // Prune if the latest value exceeds the threshold
///         trial
///             .last_intermediate_value()
///             .is_some_and(|v| v > self.threshold)
///     }
/// }
/// ```
pub trait Pruner: Send + Sync {
    /// Decides whether `trial` should stop at its latest reported step.
    fn should_prune(&self, direction: Direction, trial: &FrozenTrial, history: &[FrozenTrial])
    -> bool;
}

/// Finite values reported at `step` by the other `Complete` trials.
fn complete_values_at(trial: &FrozenTrial, history: &[FrozenTrial], step: u64) -> Vec<f64> {
    history
        .iter()
        .filter(|t| t.id != trial.id && t.state == TrialState::Complete)
        .filter_map(|t| t.intermediate_values.get(&step).copied())
        .filter(|v| v.is_finite())
        .collect()
}

/// Returns `true` if `value` is strictly worse than `threshold`.
fn is_worse(direction: Direction, value: f64, threshold: f64) -> bool {
    direction.is_improvement(threshold, value)
}
