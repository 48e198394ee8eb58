#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! A black-box optimization engine with an Optuna-like API.
//!
//! An objective function receives a [`Trial`], asks it for parameter values,
//! and returns a score. A [`Study`] runs many trials (sequentially, on
//! threads, or on a tokio runtime), records every outcome in a pluggable
//! [`Storage`](storage::Storage), and tracks the best trial. Studies are
//! identified by name, so a process attaching to an existing database
//! resumes the search instead of starting over.
//!
//! # Getting Started
//!
//! ```
//! use hyperstudy::prelude::*;
//!
//! let study = Study::builder()
//!     .minimize()
//!     .sampler(TpeSampler::builder().seed(1).build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! study
//!     .optimize(50, |trial: &Trial| {
//!         let x1 = trial.suggest_float("x1", -10.0, 10.0)?;
//!         let x2 = trial.suggest_float("x2", -10.0, 10.0)?;
//!         Ok::<_, Error>((x1 - 2.0).powi(2) + (x2 + 5.0).powi(2))
//!     })
//!     .unwrap();
//!
//! let best = study.best_trial().unwrap();
//! println!("best value {:?} with {:?}", best.value, best.external_params());
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Study`] | Schedules trials, records outcomes, tracks the best trial. |
//! | [`Trial`] | Handle for one evaluation: suggest parameters, report progress, check pruning. |
//! | [`Distribution`](distribution::Distribution) | Domain of one parameter and its internal/external representation. |
//! | [`Sampler`](sampler::Sampler) | Picks the next value to try ([`RandomSampler`](sampler::RandomSampler), [`TpeSampler`](sampler::TpeSampler)). |
//! | [`Pruner`](pruner::Pruner) | Decides whether a running trial should stop early. |
//! | [`Storage`](storage::Storage) | The shared ledger of studies and trials. |
//!
//! # Concurrency and cancellation
//!
//! [`Study::optimize_parallel`] runs trials on scoped threads and
//! `Study::optimize_async` (feature `async`) on tokio. A `Study` is also
//! `Sync`, so several threads may call [`Study::optimize`] on the same study;
//! trial numbers stay unique because storage assigns them. [`Study::stop`]
//! (or cancelling the [`CancellationToken`] handed to the builder) stops new
//! trials; running objectives observe it through [`Trial::is_cancelled`].
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `sqlite` | [`SqliteStorage`](storage::SqliteStorage), durable and shareable between processes | on |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key optimization points | on |
//! | `async` | `Study::optimize_async` on a tokio runtime | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod cancel;
pub mod distribution;
mod error;
mod frozen;
mod kde;
pub mod objective;
pub mod pruner;
mod rng_util;
pub mod sampler;
pub mod storage;
mod study;
mod trial;
mod types;

pub use cancel::CancellationToken;
pub use distribution::{Distribution, ParamValue};
pub use error::{Error, Result, TrialPruned};
pub use frozen::{FAIL_REASON_ATTR, FrozenTrial, StudySummary, TrialParam};
pub use objective::Objective;
pub use study::{Study, StudyBuilder, TrialOutcome};
pub use trial::Trial;
pub use types::{Direction, StudyId, TrialId, TrialState};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use hyperstudy::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::distribution::{Distribution, ParamValue};
    pub use crate::error::{Error, Result, TrialPruned};
    pub use crate::frozen::FrozenTrial;
    pub use crate::objective::Objective;
    pub use crate::pruner::{
        MedianPruner, NopPruner, PercentilePruner, Pruner, SuccessiveHalvingPruner,
        ThresholdPruner,
    };
    pub use crate::sampler::{RandomSampler, Sampler, TpeSampler};
    #[cfg(feature = "sqlite")]
    pub use crate::storage::SqliteStorage;
    pub use crate::storage::{MemoryStorage, Storage};
    pub use crate::study::{Study, StudyBuilder, TrialOutcome};
    pub use crate::trial::Trial;
    pub use crate::types::{Direction, TrialState};
}
