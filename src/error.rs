use crate::types::TrialState;

/// Errors produced by studies, trials, storage backends and distributions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a log-scaled distribution has a non-positive lower bound.
    #[error("invalid log bounds: low must be positive for log scale")]
    InvalidLogBounds,

    /// Returned when the quantization step is not positive.
    #[error("invalid step: step must be positive")]
    InvalidStep,

    /// Returned when categorical choices are empty.
    #[error("categorical choices cannot be empty")]
    EmptyChoices,

    /// Returned when a parameter is re-suggested with an incompatible distribution.
    #[error("distribution mismatch for '{name}': {reason}")]
    DistributionMismatch {
        /// The name of the conflicting parameter.
        name: String,
        /// Why the distributions are incompatible.
        reason: String,
    },

    /// Returned when a parameter is written twice with different values.
    #[error("parameter '{name}' is already set for this trial")]
    ParameterAlreadySet {
        /// The name of the parameter.
        name: String,
    },

    /// Returned when a mutation targets a trial that is no longer running.
    #[error("trial {number} has already finished with state {state:?}")]
    TrialAlreadyFinished {
        /// The trial number within its study.
        number: u64,
        /// The terminal state the trial is in.
        state: TrialState,
    },

    /// Returned when deserializing a distribution with an unrecognized tag.
    #[error("unknown distribution kind: {0}")]
    UnknownDistributionKind(String),

    /// Returned when a serialized distribution is structurally invalid.
    #[error("invalid distribution representation: {0}")]
    InvalidDistribution(String),

    /// Returned when an external value cannot be represented in a distribution.
    #[error("value not representable in distribution: {0}")]
    IncompatibleValue(String),

    /// Returned when requesting the best trial but no trials have completed.
    #[error("no completed trials available")]
    NoCompletedTrials,

    /// The objective function returned an error (or panicked).
    #[error("objective failed: {0}")]
    ObjectiveFailed(String),

    /// The objective function returned a NaN or infinite score.
    #[error("objective returned a non-finite value: {0}")]
    NonFiniteValue(f64),

    /// Returned when a storage backend operation fails.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Returned when no study with the given name exists.
    #[error("study not found: {0}")]
    StudyNotFound(String),

    /// Returned when creating a study whose name is already taken.
    #[error("study already exists: {0}")]
    StudyAlreadyExists(String),

    /// Returned when a trial id is unknown to the storage backend.
    #[error("trial not found: {0}")]
    TrialNotFound(u64),

    /// Returned when gamma is not in the valid range (0.0, 1.0].
    #[error("invalid gamma: {0} must be in (0.0, 1.0]")]
    InvalidGamma(f64),

    /// Returned when a TPE prior weight is negative or not finite.
    #[error("invalid prior weight: {0} must be finite and non-negative")]
    InvalidPriorWeight(f64),

    /// Returned when a trial is pruned (stopped early by the objective function).
    #[error("trial was pruned")]
    TrialPruned,

    /// Returned from a trial whose study has been cancelled.
    #[error("study was cancelled")]
    StudyCancelled,

    /// Returned when an async task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Returns `true` for errors that end a trial as pruned rather than failed.
    #[must_use]
    pub fn is_prune_signal(&self) -> bool {
        matches!(self, Error::TrialPruned | Error::StudyCancelled)
    }
}

/// Convenience type for signalling a pruned trial from an objective function.
///
/// Implements `Into<Error>` so it can be used with `?` in objectives that
/// return `Result<f64, Error>`.
///
/// # Examples
///
/// ```
/// use hyperstudy::{Error, TrialPruned};
///
/// fn objective_that_prunes() -> Result<f64, Error> {
///     Err(TrialPruned)?
/// }
/// assert!(matches!(objective_that_prunes(), Err(Error::TrialPruned)));
/// ```
#[derive(Debug)]
pub struct TrialPruned;

impl core::fmt::Display for TrialPruned {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "trial was pruned")
    }
}

impl From<TrialPruned> for Error {
    fn from(_: TrialPruned) -> Self {
        Error::TrialPruned
    }
}

