//! Study and trial storage backends.
//!
//! The [`Storage`] trait is the ledger every [`Study`](crate::Study) and
//! [`Trial`](crate::Trial) reads from and writes to.  It is the only shared
//! mutable state in the crate: samplers and pruners work on snapshots it
//! returns, and workers never talk to each other except through it.
//!
//! # Available backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemoryStorage`] | Per-trial mutexes in an in-process arena (the default) | none |
//! | `SqliteStorage` | `SQLite` database shared by several processes | `sqlite` |
//!
//! # Guarantees
//!
//! - [`create_new_trial`](Storage::create_new_trial) hands out per-study trial
//!   numbers `0, 1, 2, ...` exactly once, even under concurrent callers.
//! - Mutations of a single trial are linearizable; a trial that has reached a
//!   terminal state rejects further writes with
//!   [`TrialAlreadyFinished`](crate::Error::TrialAlreadyFinished).
//! - Backend failures surface as
//!   [`StorageUnavailable`](crate::Error::StorageUnavailable) on the call that
//!   hit them.
//!
//! # Implementing a custom backend
//!
//! Implement [`Storage`] and inject it with
//! [`StudyBuilder::storage`](crate::StudyBuilder::storage):
//!
//! ```
//! use std::sync::Arc;
//!
//! use hyperstudy::prelude::*;
//! use hyperstudy::storage::MemoryStorage;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let study = Study::builder()
//!     .name("shared")
//!     .minimize()
//!     .storage(storage)
//!     .build()
//!     .unwrap();
//! assert_eq!(study.name(), "shared");
//! ```

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::collections::BTreeMap;

pub use memory::MemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary, TrialParam, best_of};
use crate::types::{Direction, StudyId, TrialId, TrialState};

/// A transactional ledger of studies and trials.
///
/// Implementations must be `Send + Sync`: a study shares one
/// `Arc<dyn Storage>` between all of its workers.
pub trait Storage: Send + Sync {
    /// Registers a new study.
    ///
    /// # Errors
    ///
    /// [`StudyAlreadyExists`](Error::StudyAlreadyExists) if `name` is taken.
    fn create_new_study(&self, name: &str, direction: Direction) -> Result<StudyId>;

    /// Looks up a study by name.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) if no study has that name.
    fn get_study_id_from_name(&self, name: &str) -> Result<StudyId>;

    /// The name of a study.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn get_study_name(&self, study_id: StudyId) -> Result<String>;

    /// The direction a study optimizes in.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction>;

    /// Removes a study together with all of its trials.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn delete_study(&self, study_id: StudyId) -> Result<()>;

    /// Summaries of every study in the backend, ordered by id.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>>;

    /// Sets a study-level user attribute, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: &str) -> Result<()>;

    /// All study-level user attributes.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<BTreeMap<String, String>>;

    /// Allocates the next trial number and records a `Running` trial.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn create_new_trial(&self, study_id: StudyId) -> Result<TrialId>;

    /// Records a parameter on a running trial.
    ///
    /// Re-recording the same name with an identical distribution and value is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// - [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    ///   no longer running.
    /// - [`DistributionMismatch`](Error::DistributionMismatch) if `name` was
    ///   recorded with an incompatible distribution, in this trial or in any
    ///   other trial of the study.
    /// - [`ParameterAlreadySet`](Error::ParameterAlreadySet) if `name` already
    ///   holds a different value in this trial.
    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<()>;

    /// Records (or overwrites) the intermediate value at `step`.
    ///
    /// # Errors
    ///
    /// [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    /// no longer running.
    fn set_trial_intermediate_value(&self, trial_id: TrialId, step: u64, value: f64)
    -> Result<()>;

    /// Records the final value of a running trial.
    ///
    /// # Errors
    ///
    /// [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    /// no longer running.
    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()>;

    /// Moves a running trial to `state`, stamping the completion time for
    /// terminal states.
    ///
    /// # Errors
    ///
    /// [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    /// no longer running.
    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()>;

    /// Sets a user attribute on a running trial.
    ///
    /// # Errors
    ///
    /// [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    /// no longer running.
    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()>;

    /// Sets a library-owned attribute on a running trial.
    ///
    /// # Errors
    ///
    /// [`TrialAlreadyFinished`](Error::TrialAlreadyFinished) if the trial is
    /// no longer running.
    fn set_trial_system_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()>;

    /// A snapshot of one trial.
    ///
    /// # Errors
    ///
    /// [`TrialNotFound`](Error::TrialNotFound) for an unknown id.
    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial>;

    /// Snapshots of all trials of a study, ordered by trial number.
    ///
    /// # Errors
    ///
    /// [`StudyNotFound`](Error::StudyNotFound) for an unknown id.
    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>>;

    /// The per-study number of a trial.
    ///
    /// # Errors
    ///
    /// [`TrialNotFound`](Error::TrialNotFound) for an unknown id.
    fn get_trial_number_from_id(&self, trial_id: TrialId) -> Result<u64> {
        self.get_trial(trial_id).map(|t| t.number)
    }

    /// The recorded parameter `name` of a trial, if any.
    ///
    /// # Errors
    ///
    /// [`TrialNotFound`](Error::TrialNotFound) for an unknown id.
    fn get_trial_param(&self, trial_id: TrialId, name: &str) -> Result<Option<TrialParam>> {
        Ok(self.get_trial(trial_id)?.params.remove(name))
    }

    /// The best `Complete` trial under the study's direction; ties go to the
    /// lowest trial number.
    ///
    /// # Errors
    ///
    /// [`NoCompletedTrials`](Error::NoCompletedTrials) if nothing has
    /// completed yet.
    fn get_best_trial(&self, study_id: StudyId) -> Result<FrozenTrial> {
        let direction = self.get_study_direction(study_id)?;
        let trials = self.get_all_trials(study_id)?;
        best_of(&trials, direction)
            .cloned()
            .ok_or(Error::NoCompletedTrials)
    }
}

/// Builds a [`StudySummary`] from a study's trials.
pub(crate) fn summarize(
    study_id: StudyId,
    name: String,
    direction: Direction,
    user_attrs: BTreeMap<String, String>,
    trials: &[FrozenTrial],
) -> StudySummary {
    StudySummary {
        study_id,
        name,
        direction,
        best_trial: best_of(trials, direction).cloned(),
        n_trials: trials.len(),
        datetime_start: trials.iter().map(|t| t.datetime_start).min(),
        user_attrs,
    }
}

/// Checks a new parameter record against what the trial already holds.
///
/// Returns `Ok(true)` when the exact same record already exists.
pub(crate) fn check_existing_param(
    name: &str,
    existing: Option<&TrialParam>,
    internal: f64,
    distribution: &Distribution,
) -> Result<bool> {
    let Some(existing) = existing else {
        return Ok(false);
    };
    if existing.distribution != *distribution {
        return Err(Error::DistributionMismatch {
            name: name.to_owned(),
            reason: format!(
                "already recorded as {} in this trial",
                existing.distribution.kind()
            ),
        });
    }
    if existing.value.to_bits() != internal.to_bits() {
        return Err(Error::ParameterAlreadySet {
            name: name.to_owned(),
        });
    }
    Ok(true)
}

/// Checks a distribution against the one the study already uses for `name`.
pub(crate) fn check_study_distribution(
    name: &str,
    known: Option<&Distribution>,
    distribution: &Distribution,
) -> Result<()> {
    match known {
        Some(known) if !known.is_compatible_with(distribution) => {
            Err(Error::DistributionMismatch {
                name: name.to_owned(),
                reason: format!(
                    "study records it as {}, got {}",
                    known.kind(),
                    distribution.kind()
                ),
            })
        }
        _ => Ok(()),
    }
}
