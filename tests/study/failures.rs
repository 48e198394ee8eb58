use std::fmt;

use hyperstudy::prelude::*;

#[derive(Debug)]
struct Diverged(u64);

impl fmt::Display for Diverged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loss diverged at epoch {}", self.0)
    }
}

#[test]
fn errors_fail_the_trial_but_not_the_study() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(6, |trial: &Trial| {
            if trial.number() % 3 == 0 {
                return Err(Diverged(trial.number()));
            }
            Ok(1.0)
        })
        .unwrap();

    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 6);
    assert_eq!(study.n_trials_with_state(TrialState::Failed).unwrap(), 2);
    assert_eq!(
        trials[3].fail_reason(),
        Some("objective failed: loss diverged at epoch 3")
    );
    assert!(trials[3].value.is_none());
}

#[test]
fn panics_are_isolated() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(4, |trial: &Trial| -> Result<f64> {
            if trial.number() == 1 {
                panic!("boom");
            }
            Ok(trial.number() as f64)
        })
        .unwrap();

    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 4);
    assert_eq!(trials[1].state, TrialState::Failed);
    assert_eq!(trials[1].fail_reason(), Some("objective panicked: boom"));
    assert_eq!(trials[3].state, TrialState::Complete);
}

#[test]
fn panics_are_isolated_in_parallel() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_parallel(20, 4, |trial: &Trial| -> Result<f64> {
            let x = trial.suggest_float("x", 0.0, 1.0)?;
            assert!(trial.number() % 5 != 0, "trial {} exploded", trial.number());
            Ok(x)
        })
        .unwrap();

    assert_eq!(study.n_trials().unwrap(), 20);
    assert_eq!(study.n_trials_with_state(TrialState::Failed).unwrap(), 4);
    assert_eq!(study.n_trials_with_state(TrialState::Complete).unwrap(), 16);
}

#[test]
fn non_finite_scores_fail_the_trial() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(3, |trial: &Trial| match trial.number() {
            0 => Ok::<_, Error>(f64::NAN),
            1 => Ok(f64::INFINITY),
            _ => Ok(0.5),
        })
        .unwrap();
    let trials = study.trials().unwrap();
    assert_eq!(trials[0].state, TrialState::Failed);
    assert_eq!(trials[1].state, TrialState::Failed);
    assert_eq!(study.best_value().unwrap(), 0.5);
}

#[test]
fn prune_signals_mark_trials_pruned() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(3, |trial: &Trial| -> Result<f64> {
            trial.report(0, 0.9)?;
            match trial.number() {
                0 => Err(TrialPruned.into()),
                1 => Err(Error::TrialPruned),
                _ => Ok(0.1),
            }
        })
        .unwrap();
    let trials = study.trials().unwrap();
    assert_eq!(trials[0].state, TrialState::Pruned);
    assert_eq!(trials[1].state, TrialState::Pruned);
    assert_eq!(trials[1].value, Some(0.9));
    assert_eq!(trials[2].state, TrialState::Complete);
}

#[test]
fn a_study_where_everything_fails_still_returns_ok() {
    let study = Study::builder().build().unwrap();
    let result = study.optimize(5, |_: &Trial| Err::<f64, _>("no data"));
    assert!(result.is_ok());
    assert_eq!(study.n_trials_with_state(TrialState::Failed).unwrap(), 5);
    assert!(matches!(study.best_value(), Err(Error::NoCompletedTrials)));
}
