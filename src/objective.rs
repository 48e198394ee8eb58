//! The [`Objective`] trait defines what gets optimized.
//!
//! Closures are objectives thanks to a blanket impl, so the simple case
//! needs nothing from this module:
//!
//! ```
//! use hyperstudy::prelude::*;
//!
//! let study = Study::builder().minimize().build().unwrap();
//! study
//!     .optimize(20, |trial: &Trial| {
//!         let x = trial.suggest_float("x", -10.0, 10.0)?;
//!         Ok::<_, Error>((x - 3.0).powi(2))
//!     })
//!     .unwrap();
//! ```
//!
//! Implement the trait on a struct to stop early from
//! [`after_trial`](Objective::after_trial):
//!
//! ```
//! use std::ops::ControlFlow;
//!
//! use hyperstudy::prelude::*;
//! use hyperstudy::{FrozenTrial, Objective};
//!
//! struct UntilBelow(f64);
//!
//! impl Objective for UntilBelow {
//!     type Error = Error;
//!
//!     fn evaluate(&self, trial: &Trial) -> Result<f64> {
//!         let x = trial.suggest_float("x", -10.0, 10.0)?;
//!         Ok(x.abs())
//!     }
//!
//!     fn after_trial(&self, _study: &Study, trial: &FrozenTrial) -> ControlFlow<()> {
//!         match trial.value {
//!             Some(v) if v < self.0 => ControlFlow::Break(()),
//!             _ => ControlFlow::Continue(()),
//!         }
//!     }
//! }
//!
//! let study = Study::builder().minimize().build().unwrap();
//! study.optimize(10_000, UntilBelow(1.0)).unwrap();
//! assert!(study.best_value().unwrap() < 1.0);
//! ```

use core::any::Any;
use core::fmt::Display;
use core::ops::ControlFlow;

use crate::frozen::FrozenTrial;
use crate::study::Study;
use crate::trial::Trial;

/// An objective function with an optional completion hook.
///
/// # Errors and pruning
///
/// An `Err` from [`evaluate`](Objective::evaluate) marks the trial failed and
/// records the error's `Display` text as its fail reason; the study keeps
/// going. [`Error::TrialPruned`](crate::Error::TrialPruned),
/// [`TrialPruned`](crate::TrialPruned) and
/// [`Error::StudyCancelled`](crate::Error::StudyCancelled) are the exception:
/// they mark the trial pruned.
///
/// # Thread safety
///
/// `optimize_parallel` and `optimize_async` call `evaluate` from several
/// threads at once and additionally require `Sync` (and `Send + 'static` for
/// the async variant).
pub trait Objective {
    /// The error type returned by [`evaluate`](Objective::evaluate).
    type Error: Display + 'static;

    /// Evaluates one trial and returns its score. The score must be finite.
    ///
    /// # Errors
    ///
    /// Any error; see the trait docs for how it is recorded.
    fn evaluate(&self, trial: &Trial) -> Result<f64, Self::Error>;

    /// Called after each trial that completed (not failed or pruned), with
    /// its final snapshot. Return `ControlFlow::Break(())` to stop scheduling
    /// new trials.
    fn after_trial(&self, _study: &Study, _trial: &FrozenTrial) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F, E> Objective for F
where
    F: Fn(&Trial) -> Result<f64, E>,
    E: Display + 'static,
{
    type Error = E;

    fn evaluate(&self, trial: &Trial) -> Result<f64, E> {
        self(trial)
    }
}

/// Returns `true` if `e` asks for the trial to be recorded as pruned.
pub(crate) fn is_prune_signal<E: 'static>(e: &E) -> bool {
    let any: &dyn Any = e;
    if let Some(err) = any.downcast_ref::<crate::Error>() {
        err.is_prune_signal()
    } else {
        any.downcast_ref::<crate::error::TrialPruned>().is_some()
    }
}
