//! Study implementation: trial scheduling, outcome recording and best-trial tracking.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::frozen::{FAIL_REASON_ATTR, FrozenTrial, outranks};
use crate::pruner::Pruner;
use crate::sampler::Sampler;
use crate::storage::Storage;
use crate::trial::Trial;
use crate::types::{Direction, StudyId, TrialState};

mod analysis;
mod builder;
mod optimize;

#[cfg(feature = "async")]
mod async_impl;

pub use builder::StudyBuilder;

/// How a trial ended, as reported to [`Study::tell`].
#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
    /// The objective returned this score.
    Complete(f64),
    /// The trial stopped early; its last intermediate value becomes its value.
    Pruned,
    /// The objective failed for the given reason.
    Failed(String),
}

/// A named optimization run: a sampler, a pruner and a storage handle
/// shared by every trial.
///
/// All trial state lives in the storage, so a `Study` is cheap to share:
/// it is `Send + Sync`, and several threads (or processes attached to the
/// same database under the same name) may drive it at once. Trial numbers
/// stay unique and gap-free because the storage assigns them.
///
/// # Examples
///
/// ```
/// use hyperstudy::prelude::*;
///
/// let study = Study::builder()
///     .name("quadratic")
///     .minimize()
///     .sampler(TpeSampler::builder().seed(42).build().unwrap())
///     .build()
///     .unwrap();
///
/// study
///     .optimize(30, |trial: &Trial| {
///         let x = trial.suggest_float("x", -10.0, 10.0)?;
///         Ok::<_, Error>((x - 2.0).powi(2))
///     })
///     .unwrap();
///
/// assert_eq!(study.n_trials().unwrap(), 30);
/// assert!(study.best_value().unwrap() >= 0.0);
/// ```
pub struct Study {
    study_id: StudyId,
    name: String,
    direction: Direction,
    sampler: Arc<dyn Sampler>,
    pruner: Arc<dyn Pruner>,
    storage: Arc<dyn Storage>,
    cancel: CancellationToken,
    /// `(trial number, value)` of the best trial this process has seen.
    best: Mutex<Option<(u64, f64)>>,
}

impl core::fmt::Debug for Study {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Study")
            .field("study_id", &self.study_id)
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("best", &*self.best.lock())
            .finish_non_exhaustive()
    }
}

impl Study {
    /// Return a [`StudyBuilder`] for constructing a study with a fluent API.
    #[must_use]
    pub fn builder() -> StudyBuilder {
        StudyBuilder::new()
    }

    /// Attaches to the existing study `name` with the default sampler and
    /// pruner.
    ///
    /// Use [`StudyBuilder::load`] to attach with custom strategies.
    ///
    /// # Errors
    ///
    /// [`Error::StudyNotFound`] if `storage` has no study called `name`.
    pub fn load(name: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        Self::builder().name(name).storage(storage).load()
    }

    pub(crate) fn assemble(
        study_id: StudyId,
        name: String,
        direction: Direction,
        sampler: Arc<dyn Sampler>,
        pruner: Arc<dyn Pruner>,
        storage: Arc<dyn Storage>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let best = match storage.get_best_trial(study_id) {
            Ok(trial) => trial.value.map(|v| (trial.number, v)),
            Err(Error::NoCompletedTrials) => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            study_id,
            name,
            direction,
            sampler,
            pruner,
            storage,
            cancel,
            best: Mutex::new(best),
        })
    }

    /// Storage id of this study.
    #[must_use]
    pub fn study_id(&self) -> StudyId {
        self.study_id
    }

    /// The study's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The storage backend shared by this study's trials.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The study's cancellation token. Clone it into a signal handler or a
    /// supervisor thread to stop the study from outside.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stops the study: no new trials are created and running objectives
    /// see [`Trial::is_cancelled`] turn `true`.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            trace_info!(study = %self.name, "study stop requested");
        }
        self.cancel.cancel();
    }

    /// Creates a new running trial.
    ///
    /// # Errors
    ///
    /// - [`Error::StudyCancelled`] once the study has been stopped.
    /// - Storage errors.
    pub fn ask(&self) -> Result<Trial> {
        if self.cancel.is_cancelled() {
            return Err(Error::StudyCancelled);
        }
        let id = self.storage.create_new_trial(self.study_id)?;
        let number = self.storage.get_trial_number_from_id(id)?;
        trace_debug!(trial = number, "trial created");
        Ok(Trial::new(
            id,
            number,
            self.study_id,
            self.direction,
            Arc::clone(&self.storage),
            Arc::clone(&self.sampler),
            Arc::clone(&self.pruner),
            self.cancel.clone(),
        ))
    }

    /// Finishes `trial` with `outcome` and returns its final snapshot.
    ///
    /// A non-finite `Complete` score is recorded as a failure. A pruned
    /// trial takes its last intermediate value, if it reported one, as its
    /// value.
    ///
    /// # Errors
    ///
    /// - [`Error::TrialAlreadyFinished`] if the trial was already finished.
    /// - Storage errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperstudy::{Study, TrialOutcome, TrialState};
    ///
    /// let study = Study::builder().maximize().build().unwrap();
    /// let trial = study.ask().unwrap();
    /// let x = trial.suggest_float("x", 0.0, 1.0).unwrap();
    /// let frozen = study.tell(trial, TrialOutcome::Complete(x)).unwrap();
    /// assert_eq!(frozen.state, TrialState::Complete);
    /// assert_eq!(study.best_value().unwrap(), x);
    /// ```
    #[allow(clippy::needless_pass_by_value)]
    pub fn tell(&self, trial: Trial, outcome: TrialOutcome) -> Result<FrozenTrial> {
        let id = trial.id();
        let number = trial.number();
        let outcome = match outcome {
            TrialOutcome::Complete(value) if !value.is_finite() => {
                TrialOutcome::Failed(Error::NonFiniteValue(value).to_string())
            }
            other => other,
        };

        match outcome {
            TrialOutcome::Complete(value) => {
                self.storage.set_trial_value(id, value)?;
                self.storage.set_trial_state(id, TrialState::Complete)?;
                trace_info!(trial = number, value, "trial completed");
                self.record_best(number, value);
            }
            TrialOutcome::Pruned => {
                let snapshot = self.storage.get_trial(id)?;
                if let Some(value) = snapshot.last_intermediate_value() {
                    self.storage.set_trial_value(id, value)?;
                }
                self.storage.set_trial_state(id, TrialState::Pruned)?;
                trace_info!(trial = number, step = snapshot.last_step(), "trial pruned");
            }
            TrialOutcome::Failed(reason) => {
                self.storage
                    .set_trial_system_attr(id, FAIL_REASON_ATTR, &reason)?;
                self.storage.set_trial_state(id, TrialState::Failed)?;
                trace_info!(trial = number, reason = %reason, "trial failed");
            }
        }
        self.storage.get_trial(id)
    }

    fn record_best(&self, number: u64, value: f64) {
        let mut best = self.best.lock();
        let improved = match *best {
            None => true,
            Some(incumbent) => outranks(self.direction, (number, value), incumbent),
        };
        if improved {
            *best = Some((number, value));
            trace_info!(trial = number, value, "new best value found");
        }
    }
}
