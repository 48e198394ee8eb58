use hyperstudy::prelude::*;
use hyperstudy::{FAIL_REASON_ATTR, Objective};

#[test]
fn ask_tell_matches_optimize() {
    let study = Study::builder()
        .minimize()
        .sampler(RandomSampler::with_seed(3))
        .build()
        .unwrap();
    for _ in 0..10 {
        let trial = study.ask().unwrap();
        let x = trial.suggest_float("x", -5.0, 5.0).unwrap();
        let frozen = study.tell(trial, TrialOutcome::Complete(x * x)).unwrap();
        assert_eq!(frozen.state, TrialState::Complete);
    }
    assert_eq!(crate::numbers(&study), (0..10).collect::<Vec<_>>());
    let best = study.best_trial().unwrap();
    let x = best.param("x").and_then(|v| v.as_f64()).unwrap();
    assert_eq!(best.value, Some(x * x));
}

#[test]
fn open_trials_stay_running() {
    let study = Study::builder().build().unwrap();
    let a = study.ask().unwrap();
    let b = study.ask().unwrap();
    assert_eq!((a.number(), b.number()), (0, 1));
    study.tell(b, TrialOutcome::Complete(1.0)).unwrap();

    let trials = study.trials().unwrap();
    assert_eq!(trials[0].state, TrialState::Running);
    assert_eq!(trials[1].state, TrialState::Complete);
    assert_eq!(study.n_trials_with_state(TrialState::Running).unwrap(), 1);
    drop(a);
}

#[test]
fn failed_outcome_records_reason() {
    let study = Study::builder().build().unwrap();
    let trial = study.ask().unwrap();
    let frozen = study
        .tell(trial, TrialOutcome::Failed("out of memory".into()))
        .unwrap();
    assert_eq!(frozen.state, TrialState::Failed);
    assert_eq!(frozen.system_attrs[FAIL_REASON_ATTR], "out of memory");
    assert!(matches!(study.best_trial(), Err(Error::NoCompletedTrials)));
}

#[test]
fn telling_a_finished_trial_fails() {
    let study = Study::builder().build().unwrap();
    let trial = study.ask().unwrap();
    study
        .storage()
        .set_trial_state(trial.id(), TrialState::Complete)
        .unwrap();
    assert!(matches!(
        study.tell(trial, TrialOutcome::Complete(1.0)),
        Err(Error::TrialAlreadyFinished { number: 0, .. })
    ));
}

#[test]
fn attributes_are_recorded() {
    let study = Study::builder().name("attrs").build().unwrap();
    study.set_user_attr("purpose", "smoke test").unwrap();
    let trial = study.ask().unwrap();
    trial.set_user_attr("gpu", "0").unwrap();
    let frozen = study.tell(trial, TrialOutcome::Complete(0.0)).unwrap();

    assert_eq!(frozen.user_attrs["gpu"], "0");
    assert_eq!(study.user_attrs().unwrap()["purpose"], "smoke test");
}

#[test]
fn struct_objectives_work_like_closures() {
    struct Shifted(f64);

    impl Objective for Shifted {
        type Error = Error;

        fn evaluate(&self, trial: &Trial) -> Result<f64> {
            let x = trial.suggest_float("x", -1.0, 1.0)?;
            Ok(x + self.0)
        }
    }

    let study = Study::builder().maximize().build().unwrap();
    study.optimize(5, Shifted(10.0)).unwrap();
    let best = study.best_value().unwrap();
    assert!((9.0..=11.0).contains(&best));
}

#[test]
fn best_is_the_lowest_complete_value() {
    let study = Study::builder().minimize().build().unwrap();
    study
        .optimize(3, |trial: &Trial| match trial.number() {
            0 => Err(Error::ObjectiveFailed("5.0 but crashed".into())),
            1 => Ok(2.0),
            _ => Ok(7.0),
        })
        .unwrap();
    assert_eq!(study.best_value().unwrap(), 2.0);
    assert_eq!(study.best_trial().unwrap().number, 1);
    assert_eq!(study.n_trials_with_state(TrialState::Failed).unwrap(), 1);
}

#[test]
fn maximize_and_ties() {
    let study = Study::builder().maximize().build().unwrap();
    for v in [3.0, 8.0, 8.0, 1.0] {
        let trial = study.ask().unwrap();
        study.tell(trial, TrialOutcome::Complete(v)).unwrap();
    }
    assert_eq!(study.best_value().unwrap(), 8.0);
    assert_eq!(study.best_trial().unwrap().number, 1);
}
