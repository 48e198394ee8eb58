//! The handle an objective function uses to draw parameters and report progress.

use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::distribution::{Distribution, ParamValue};
use crate::error::{Error, Result};
use crate::frozen::FrozenTrial;
use crate::pruner::Pruner;
use crate::sampler::Sampler;
use crate::storage::Storage;
use crate::types::{Direction, StudyId, TrialId};

/// A single evaluation of the objective function.
///
/// A `Trial` holds no parameter state of its own: every suggestion, report
/// and attribute is read from and written to the study's storage, so two
/// handles to the same trial (or two processes sharing a database) always
/// agree. Handles are created by [`Study::ask`](crate::Study::ask) or by the
/// `optimize*` loops.
///
/// Suggestions are idempotent within a trial: asking again for a name with
/// the same distribution returns the recorded value, while a different
/// distribution fails with [`Error::DistributionMismatch`].
///
/// # Examples
///
/// ```
/// use hyperstudy::{Error, Study, Trial};
///
/// let study = Study::builder().minimize().build().unwrap();
/// study
///     .optimize(5, |trial: &Trial| {
///         let x = trial.suggest_float("x", -10.0, 10.0)?;
///         let n = trial.suggest_int("n", 1, 3)?;
///         let op = trial.suggest_categorical("op", ["add", "mul"])?;
///         let y = if op == "add" { x + n as f64 } else { x * n as f64 };
///         Ok::<_, Error>(y * y)
///     })
///     .unwrap();
/// assert_eq!(study.n_trials().unwrap(), 5);
/// ```
pub struct Trial {
    id: TrialId,
    number: u64,
    study_id: StudyId,
    direction: Direction,
    storage: Arc<dyn Storage>,
    sampler: Arc<dyn Sampler>,
    pruner: Arc<dyn Pruner>,
    cancel: CancellationToken,
}

impl core::fmt::Debug for Trial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trial")
            .field("id", &self.id)
            .field("number", &self.number)
            .field("study_id", &self.study_id)
            .field("direction", &self.direction)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Trial {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: TrialId,
        number: u64,
        study_id: StudyId,
        direction: Direction,
        storage: Arc<dyn Storage>,
        sampler: Arc<dyn Sampler>,
        pruner: Arc<dyn Pruner>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            number,
            study_id,
            direction,
            storage,
            sampler,
            pruner,
            cancel,
        }
    }

    /// Backend-wide trial id.
    #[must_use]
    pub fn id(&self) -> TrialId {
        self.id
    }

    /// Zero-based number of this trial within its study.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Id of the owning study.
    #[must_use]
    pub fn study_id(&self) -> StudyId {
        self.study_id
    }

    /// Suggests a value for `name` from an arbitrary distribution.
    ///
    /// This is what the typed `suggest_*` helpers call.
    ///
    /// # Errors
    ///
    /// - Validation errors for a malformed `distribution`.
    /// - [`Error::DistributionMismatch`] if `name` was already suggested in
    ///   this trial (or recorded elsewhere in the study) with an
    ///   incompatible distribution.
    /// - [`Error::TrialAlreadyFinished`] if the trial is no longer running.
    /// - Storage errors.
    pub fn suggest(&self, name: &str, distribution: Distribution) -> Result<ParamValue> {
        let internal = self.suggest_internal(name, &distribution)?;
        Ok(distribution.to_external_repr(internal))
    }

    /// Suggests a float from `[low, high]`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest); also [`Error::InvalidBounds`].
    pub fn suggest_float(&self, name: &str, low: f64, high: f64) -> Result<f64> {
        self.suggest_internal(name, &Distribution::uniform(low, high)?)
    }

    /// Suggests a float from `[low, high]`, sampled in log space.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest); also [`Error::InvalidLogBounds`].
    pub fn suggest_log_float(&self, name: &str, low: f64, high: f64) -> Result<f64> {
        self.suggest_internal(name, &Distribution::log_uniform(low, high)?)
    }

    /// Suggests a float from the grid `low, low + q, ...` up to `high`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest); also [`Error::InvalidStep`].
    pub fn suggest_discrete_float(&self, name: &str, low: f64, high: f64, q: f64) -> Result<f64> {
        let distribution = Distribution::discrete_uniform(low, high, q)?;
        let internal = self.suggest_internal(name, &distribution)?;
        expect_float(name, &distribution.to_external_repr(internal))
    }

    /// Suggests an integer from `[low, high]`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest); also [`Error::InvalidBounds`].
    pub fn suggest_int(&self, name: &str, low: i64, high: i64) -> Result<i64> {
        let distribution = Distribution::int_uniform(low, high)?;
        let internal = self.suggest_internal(name, &distribution)?;
        distribution
            .to_external_repr(internal)
            .as_i64()
            .ok_or_else(|| mismatch(name, "expected an integer"))
    }

    /// Suggests one of `choices`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest); also [`Error::EmptyChoices`].
    pub fn suggest_categorical<S: Into<String>>(
        &self,
        name: &str,
        choices: impl IntoIterator<Item = S>,
    ) -> Result<String> {
        let distribution = Distribution::categorical(choices)?;
        let internal = self.suggest_internal(name, &distribution)?;
        match distribution.to_external_repr(internal) {
            ParamValue::Categorical(label) => Ok(label),
            _ => Err(mismatch(name, "expected a categorical label")),
        }
    }

    /// Records `value` as the intermediate result at `step`.
    ///
    /// Reporting the same step twice overwrites the earlier value. Reporting
    /// does not stop the trial; call [`should_prune`](Self::should_prune).
    ///
    /// # Errors
    ///
    /// - [`Error::NonFiniteValue`] for NaN or infinite values.
    /// - [`Error::TrialAlreadyFinished`] if the trial is no longer running.
    pub fn report(&self, step: u64, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::NonFiniteValue(value));
        }
        self.storage
            .set_trial_intermediate_value(self.id, step, value)
    }

    /// Asks the study's pruner whether this trial should stop now.
    ///
    /// The verdict is advisory; an objective that agrees should return
    /// [`TrialPruned`](crate::TrialPruned).
    ///
    /// # Errors
    ///
    /// Storage errors while reading the trial or its siblings.
    pub fn should_prune(&self) -> Result<bool> {
        let trial = self.storage.get_trial(self.id)?;
        let history = self.history()?;
        let prune = self.pruner.should_prune(self.direction, &trial, &history);
        if prune {
            trace_debug!(
                trial = self.number,
                step = trial.last_step(),
                "pruner requested stop"
            );
        }
        Ok(prune)
    }

    /// Attaches a user attribute to this trial.
    ///
    /// # Errors
    ///
    /// [`Error::TrialAlreadyFinished`] if the trial is no longer running.
    pub fn set_user_attr(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_trial_user_attr(self.id, key, value)
    }

    /// A fresh snapshot of this trial from storage.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn snapshot(&self) -> Result<FrozenTrial> {
        self.storage.get_trial(self.id)
    }

    /// The study's cancellation token.
    ///
    /// Long-running objectives should poll it (or hand a clone to their
    /// worker threads) and return early once it is raised.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once the study has been stopped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`Error::StudyCancelled`] once the study has been stopped.
    ///
    /// Meant for `?` inside an objective; the trial is then recorded as
    /// pruned rather than failed.
    ///
    /// # Errors
    ///
    /// [`Error::StudyCancelled`] if the study was stopped.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::StudyCancelled)
        } else {
            Ok(())
        }
    }

    fn history(&self) -> Result<Vec<FrozenTrial>> {
        let mut trials = self.storage.get_all_trials(self.study_id)?;
        trials.retain(|t| t.id != self.id);
        Ok(trials)
    }

    fn suggest_internal(&self, name: &str, distribution: &Distribution) -> Result<f64> {
        distribution.validate()?;

        let trial = self.storage.get_trial(self.id)?;
        if let Some(recorded) = trial.params.get(name) {
            return reuse(name, recorded.value, &recorded.distribution, distribution);
        }

        let history = self.history()?;
        let internal = self
            .sampler
            .sample(self.direction, &trial, name, distribution, &history);

        match self
            .storage
            .set_trial_param(self.id, name, internal, distribution)
        {
            Ok(()) => Ok(internal),
            // Another handle to this trial recorded the name first; use its value.
            Err(Error::ParameterAlreadySet { .. }) => {
                let recorded = self
                    .storage
                    .get_trial_param(self.id, name)?
                    .ok_or_else(|| Error::TrialNotFound(self.id))?;
                reuse(name, recorded.value, &recorded.distribution, distribution)
            }
            Err(e) => Err(e),
        }
    }
}

fn reuse(name: &str, value: f64, recorded: &Distribution, requested: &Distribution) -> Result<f64> {
    if recorded == requested {
        Ok(value)
    } else {
        Err(mismatch(
            name,
            &format!("already suggested as {recorded:?}, now requested as {requested:?}"),
        ))
    }
}

fn mismatch(name: &str, reason: &str) -> Error {
    Error::DistributionMismatch {
        name: name.to_owned(),
        reason: reason.to_owned(),
    }
}

fn expect_float(name: &str, value: &ParamValue) -> Result<f64> {
    match value {
        ParamValue::Float(v) => Ok(*v),
        _ => Err(mismatch(name, "expected a float")),
    }
}
