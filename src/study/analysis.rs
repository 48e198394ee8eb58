use std::collections::{BTreeMap, HashMap};

use crate::distribution::ParamValue;
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary};
use crate::types::TrialState;

use super::Study;

impl Study {
    /// Snapshots of every trial in the study, ordered by trial number.
    ///
    /// Trials written by other processes sharing the storage are included.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn trials(&self) -> Result<Vec<FrozenTrial>> {
        self.storage.get_all_trials(self.study_id)
    }

    /// Number of trials in any state.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn n_trials(&self) -> Result<usize> {
        Ok(self.trials()?.len())
    }

    /// Number of trials in `state`.
    ///
    /// # Errors
    ///
    /// Storage errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperstudy::{Error, Study, Trial, TrialState};
    ///
    /// let study = Study::builder().build().unwrap();
    /// study
    ///     .optimize(4, |trial: &Trial| {
    ///         if trial.number() % 2 == 0 {
    ///             Ok(1.0)
    ///         } else {
    ///             Err(Error::ObjectiveFailed("odd".into()))
    ///         }
    ///     })
    ///     .unwrap();
    /// assert_eq!(study.n_trials_with_state(TrialState::Complete).unwrap(), 2);
    /// assert_eq!(study.n_trials_with_state(TrialState::Failed).unwrap(), 2);
    /// ```
    pub fn n_trials_with_state(&self, state: TrialState) -> Result<usize> {
        Ok(self.trials()?.iter().filter(|t| t.state == state).count())
    }

    /// The best complete trial; ties go to the earliest trial.
    ///
    /// Read from storage, so completions from other processes count.
    ///
    /// # Errors
    ///
    /// [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_trial(&self) -> Result<FrozenTrial> {
        self.storage.get_best_trial(self.study_id)
    }

    /// The value of [`best_trial`](Self::best_trial).
    ///
    /// # Errors
    ///
    /// [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_value(&self) -> Result<f64> {
        self.best_trial()?.value.ok_or(Error::NoCompletedTrials)
    }

    /// The parameters of [`best_trial`](Self::best_trial) as handed to the
    /// objective.
    ///
    /// # Errors
    ///
    /// [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_params(&self) -> Result<HashMap<String, ParamValue>> {
        Ok(self.best_trial()?.external_params())
    }

    /// Sets a study-level user attribute.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn set_user_attr(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_study_user_attr(self.study_id, key, value)
    }

    /// Study-level user attributes.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn user_attrs(&self) -> Result<BTreeMap<String, String>> {
        self.storage.get_study_user_attrs(self.study_id)
    }

    /// Summary of this study as the storage reports it.
    ///
    /// # Errors
    ///
    /// Storage errors, or [`Error::StudyNotFound`] if the study was deleted.
    pub fn summary(&self) -> Result<StudySummary> {
        self.storage
            .get_all_study_summaries()?
            .into_iter()
            .find(|s| s.study_id == self.study_id)
            .ok_or_else(|| Error::StudyNotFound(self.name.clone()))
    }
}
