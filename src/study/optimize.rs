use core::ops::ControlFlow;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::frozen::FrozenTrial;
use crate::objective::{Objective, is_prune_signal};
use crate::trial::Trial;
use crate::types::TrialState;

use super::{Study, TrialOutcome};

impl Study {
    /// Runs up to `n_trials` evaluations one after another.
    ///
    /// Accepts any [`Objective`], including plain closures
    /// (`Fn(&Trial) -> Result<f64, E>`). Failing or panicking evaluations are
    /// recorded as failed trials and the loop moves on; see [`Objective`]
    /// for how errors map to trial states.
    ///
    /// The loop ends early when the study is [stopped](Study::stop) or when
    /// [`Objective::after_trial`] returns `Break`.
    ///
    /// # Errors
    ///
    /// Storage errors only; failed trials never fail the study.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperstudy::prelude::*;
    ///
    /// let study = Study::builder()
    ///     .sampler(RandomSampler::with_seed(42))
    ///     .build()
    ///     .unwrap();
    ///
    /// study
    ///     .optimize(10, |trial: &Trial| {
    ///         let x = trial.suggest_float("x", -10.0, 10.0)?;
    ///         Ok::<_, Error>(x * x)
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(study.n_trials().unwrap(), 10);
    /// ```
    #[allow(clippy::needless_pass_by_value)]
    pub fn optimize<O: Objective>(&self, n_trials: usize, objective: O) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize",
            study = %self.name,
            n_trials,
            direction = ?self.direction
        )
        .entered();

        for _ in 0..n_trials {
            let Some(frozen) = self.run_trial(&objective)? else {
                break;
            };
            if self.after_trial(&objective, &frozen).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Runs `n_trials` evaluations on `concurrency` scoped threads.
    ///
    /// `concurrency == 0` starts one thread per trial. Workers claim trial
    /// slots from a shared counter, so exactly `n_trials` trials are started
    /// unless the study is stopped or an `after_trial` hook breaks; trials
    /// already running then finish normally.
    ///
    /// # Errors
    ///
    /// The first storage error hit by any worker. Other workers finish their
    /// current trial and stop.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from [`Objective::after_trial`]; panics inside
    /// [`Objective::evaluate`] are recorded as failed trials instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperstudy::prelude::*;
    ///
    /// let study = Study::builder().build().unwrap();
    /// study
    ///     .optimize_parallel(40, 4, |trial: &Trial| {
    ///         let x = trial.suggest_float("x", -10.0, 10.0)?;
    ///         Ok::<_, Error>(x * x)
    ///     })
    ///     .unwrap();
    ///
    /// let mut numbers: Vec<u64> = study.trials().unwrap().iter().map(|t| t.number).collect();
    /// numbers.sort_unstable();
    /// assert_eq!(numbers, (0..40).collect::<Vec<_>>());
    /// ```
    #[allow(clippy::needless_pass_by_value)]
    pub fn optimize_parallel<O>(
        &self,
        n_trials: usize,
        concurrency: usize,
        objective: O,
    ) -> Result<()>
    where
        O: Objective + Sync,
    {
        let workers = if concurrency == 0 {
            n_trials
        } else {
            concurrency.min(n_trials)
        };

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize_parallel",
            study = %self.name,
            n_trials,
            concurrency = workers,
            direction = ?self.direction
        )
        .entered();

        let claimed = AtomicUsize::new(0);
        let halt = AtomicBool::new(false);

        let results: Vec<Result<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| self.worker_loop(n_trials, &objective, &claimed, &halt))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect()
        });

        results.into_iter().collect()
    }

    fn worker_loop<O: Objective>(
        &self,
        n_trials: usize,
        objective: &O,
        claimed: &AtomicUsize,
        halt: &AtomicBool,
    ) -> Result<()> {
        while !halt.load(Ordering::SeqCst) {
            if claimed.fetch_add(1, Ordering::SeqCst) >= n_trials {
                break;
            }
            let frozen = match self.run_trial(objective) {
                Ok(Some(frozen)) => frozen,
                Ok(None) => break,
                Err(e) => {
                    trace_info!(error = %e, "storage error stopped a worker");
                    halt.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            };
            if self.after_trial(objective, &frozen).is_break() {
                halt.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    /// Creates one trial, evaluates it and records the outcome.
    ///
    /// Returns `Ok(None)` without creating a trial once the study is stopped.
    pub(super) fn run_trial<O: Objective>(&self, objective: &O) -> Result<Option<FrozenTrial>> {
        let trial = match self.ask() {
            Ok(trial) => trial,
            Err(Error::StudyCancelled) => {
                trace_info!(study = %self.name, "cancellation observed, no new trials");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let outcome = evaluate_guarded(objective, &trial);
        self.tell(trial, outcome).map(Some)
    }

    pub(super) fn after_trial<O: Objective>(
        &self,
        objective: &O,
        frozen: &FrozenTrial,
    ) -> ControlFlow<()> {
        if frozen.state == TrialState::Complete {
            objective.after_trial(self, frozen)
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Evaluates `objective`, turning errors and panics into an outcome.
pub(super) fn evaluate_guarded<O>(objective: &O, trial: &Trial) -> TrialOutcome
where
    O: Objective + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| objective.evaluate(trial))) {
        Ok(Ok(value)) => TrialOutcome::Complete(value),
        Ok(Err(e)) if is_prune_signal(&e) => TrialOutcome::Pruned,
        Ok(Err(e)) => TrialOutcome::Failed(Error::ObjectiveFailed(e.to_string()).to_string()),
        Err(payload) => {
            TrialOutcome::Failed(format!("objective panicked: {}", panic_message(&*payload)))
        }
    }
}

fn panic_message(payload: &(dyn core::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
