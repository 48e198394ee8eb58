use hyperstudy::prelude::*;

fn study() -> Study {
    Study::builder()
        .sampler(RandomSampler::with_seed(5))
        .build()
        .unwrap()
}

#[test]
fn repeated_suggestions_return_the_recorded_value() {
    let study = study();
    let trial = study.ask().unwrap();
    let x = trial.suggest_float("x", -1.0, 1.0).unwrap();
    let n = trial.suggest_int("n", 0, 100).unwrap();
    let act = trial.suggest_categorical("act", ["relu", "gelu", "tanh"]).unwrap();
    for _ in 0..5 {
        assert_eq!(trial.suggest_float("x", -1.0, 1.0).unwrap(), x);
        assert_eq!(trial.suggest_int("n", 0, 100).unwrap(), n);
        assert_eq!(
            trial
                .suggest_categorical("act", ["relu", "gelu", "tanh"])
                .unwrap(),
            act
        );
    }
    let snapshot = trial.snapshot().unwrap();
    assert_eq!(snapshot.params.len(), 3);
    assert_eq!(snapshot.param("x"), Some(ParamValue::Float(x)));
}

#[test]
fn changing_the_distribution_within_a_trial_is_an_error() {
    let study = study();
    let trial = study.ask().unwrap();
    trial.suggest_float("x", 0.0, 1.0).unwrap();
    assert!(matches!(
        trial.suggest_float("x", 0.0, 2.0),
        Err(Error::DistributionMismatch { name, .. }) if name == "x"
    ));
    assert!(matches!(
        trial.suggest_int("x", 0, 1),
        Err(Error::DistributionMismatch { .. })
    ));
    trial.suggest_categorical("c", ["a", "b"]).unwrap();
    assert!(matches!(
        trial.suggest_categorical("c", ["a", "b", "c"]),
        Err(Error::DistributionMismatch { .. })
    ));
}

#[test]
fn kind_conflicts_across_trials_are_errors() {
    let study = study();
    let first = study.ask().unwrap();
    first.suggest_float("lr", 1e-4, 1e-1).unwrap();
    study.tell(first, TrialOutcome::Complete(0.3)).unwrap();

    let second = study.ask().unwrap();
    // Same kind, different bounds: allowed.
    let lr = second.suggest_float("lr", 1e-3, 1.0).unwrap();
    assert!((1e-3..=1.0).contains(&lr));

    let third = study.ask().unwrap();
    assert!(matches!(
        third.suggest_int("lr", 0, 10),
        Err(Error::DistributionMismatch { .. })
    ));
}

#[test]
fn invalid_distributions_are_rejected_without_recording() {
    let study = study();
    let trial = study.ask().unwrap();
    assert!(matches!(
        trial.suggest_float("x", 1.0, 0.0),
        Err(Error::InvalidBounds { .. })
    ));
    assert!(matches!(
        trial.suggest_log_float("x", 0.0, 1.0),
        Err(Error::InvalidLogBounds)
    ));
    assert!(matches!(
        trial.suggest_categorical("c", Vec::<&str>::new()),
        Err(Error::EmptyChoices)
    ));
    assert!(trial.snapshot().unwrap().params.is_empty());
}

#[test]
fn typed_helpers_return_values_in_range() {
    let study = study();
    study
        .optimize(30, |trial: &Trial| {
            let lr = trial.suggest_log_float("lr", 1e-5, 1e-1)?;
            let dropout = trial.suggest_discrete_float("dropout", 0.0, 0.5, 0.1)?;
            let layers = trial.suggest_int("layers", 1, 4)?;
            let optimizer = trial.suggest("optimizer", Distribution::categorical(["adam", "sgd"])?)?;
            assert!((1e-5..=1e-1).contains(&lr));
            assert!((0.0..=0.5).contains(&dropout));
            assert!(((dropout * 10.0).round() - dropout * 10.0).abs() < 1e-9);
            assert!((1..=4).contains(&layers));
            assert!(matches!(optimizer.as_str(), Some("adam" | "sgd")));
            Ok::<_, Error>(lr * layers as f64)
        })
        .unwrap();
    assert_eq!(study.n_trials_with_state(TrialState::Complete).unwrap(), 30);
}

#[test]
fn single_value_ranges_are_constant() {
    let study = study();
    let trial = study.ask().unwrap();
    assert_eq!(trial.suggest_float("x", 2.5, 2.5).unwrap(), 2.5);
    assert_eq!(trial.suggest_int("n", 7, 7).unwrap(), 7);
    assert_eq!(trial.suggest_categorical("c", ["only"]).unwrap(), "only");
}

#[test]
fn best_params_use_external_values() {
    let study = Study::builder().maximize().build().unwrap();
    let trial = study.ask().unwrap();
    trial.suggest_categorical("act", ["relu", "tanh"]).unwrap();
    let n = trial.suggest_int("n", 1, 3).unwrap();
    study.tell(trial, TrialOutcome::Complete(1.0)).unwrap();

    let best = study.best_params().unwrap();
    assert!(matches!(best["act"], ParamValue::Categorical(_)));
    assert_eq!(best["n"], ParamValue::Int(n));
}
