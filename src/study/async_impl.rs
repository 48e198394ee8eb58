use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::objective::Objective;
use crate::trial::Trial;

use super::optimize::evaluate_guarded;
use super::{Study, TrialOutcome};

impl Study {
    /// Runs `n_trials` evaluations with up to `concurrency` of them in flight.
    ///
    /// Each evaluation runs on tokio's blocking pool
    /// ([`JoinSet::spawn_blocking`]), keeping the runtime responsive for
    /// CPU-bound objectives, while trial creation and outcome recording stay
    /// on the calling task.
    /// `concurrency == 0` puts every trial in flight at once.
    ///
    /// Stopping the study or a `Break` from
    /// [`after_trial`](Objective::after_trial) stops new trials; in-flight
    /// ones are drained.
    ///
    /// # Errors
    ///
    /// - Storage errors.
    /// - [`Error::TaskError`] if a blocking task could not be joined.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyperstudy::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> hyperstudy::Result<()> {
    /// let study = Study::builder().sampler(RandomSampler::with_seed(42)).build()?;
    ///
    /// study
    ///     .optimize_async(10, 4, |trial: &Trial| {
    ///         let x = trial.suggest_float("x", -10.0, 10.0)?;
    ///         Ok::<_, Error>(x * x)
    ///     })
    ///     .await?;
    ///
    /// assert_eq!(study.n_trials()?, 10);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn optimize_async<O>(
        &self,
        n_trials: usize,
        concurrency: usize,
        objective: O,
    ) -> Result<()>
    where
        O: Objective + Send + Sync + 'static,
    {
        let limit = if concurrency == 0 {
            n_trials.max(1)
        } else {
            concurrency
        };
        trace_info!(study = %self.name, n_trials, concurrency = limit, "optimize_async started");

        let objective = Arc::new(objective);
        let mut in_flight: JoinSet<(Trial, TrialOutcome)> = JoinSet::new();
        let mut started = 0;
        let mut halted = false;

        while started < n_trials && !halted {
            while in_flight.len() >= limit {
                halted |= self.finish_next(&mut in_flight, &*objective).await?;
            }
            if halted {
                break;
            }

            let trial = match self.ask() {
                Ok(trial) => trial,
                Err(Error::StudyCancelled) => {
                    trace_info!(study = %self.name, "cancellation observed, no new trials");
                    break;
                }
                Err(e) => return Err(e),
            };
            let obj = Arc::clone(&objective);
            in_flight.spawn_blocking(move || {
                let outcome = evaluate_guarded(&*obj, &trial);
                (trial, outcome)
            });
            started += 1;
        }

        while !in_flight.is_empty() {
            // Draining: hooks still run, but there is nothing left to stop.
            self.finish_next(&mut in_flight, &*objective).await?;
        }
        Ok(())
    }

    /// Records the next finished evaluation. Returns `true` if the
    /// objective's `after_trial` hook asked to stop.
    async fn finish_next<O: Objective>(
        &self,
        in_flight: &mut JoinSet<(Trial, TrialOutcome)>,
        objective: &O,
    ) -> Result<bool> {
        let Some(joined) = in_flight.join_next().await else {
            return Ok(false);
        };
        let (trial, outcome) = joined.map_err(|e| Error::TaskError(e.to_string()))?;
        let frozen = self.tell(trial, outcome)?;
        Ok(self.after_trial(objective, &frozen).is_break())
    }
}
