//! Behaviour every backend must share. Each backend module runs these
//! against its own fresh storage.

use std::collections::HashSet;
use std::sync::Arc;

use hyperstudy::storage::Storage;
use hyperstudy::{Direction, Distribution, Error, FAIL_REASON_ATTR, TrialState};

pub fn studies_are_named_and_unique(storage: &dyn Storage) {
    let id = storage
        .create_new_study("alpha", Direction::Maximize)
        .unwrap();
    assert_eq!(storage.get_study_id_from_name("alpha").unwrap(), id);
    assert_eq!(storage.get_study_name(id).unwrap(), "alpha");
    assert_eq!(storage.get_study_direction(id).unwrap(), Direction::Maximize);
    assert!(matches!(
        storage.create_new_study("alpha", Direction::Minimize),
        Err(Error::StudyAlreadyExists(name)) if name == "alpha"
    ));
    assert!(matches!(
        storage.get_study_id_from_name("beta"),
        Err(Error::StudyNotFound(_))
    ));
}

pub fn trial_lifecycle(storage: &dyn Storage) {
    let study = storage.create_new_study("life", Direction::Minimize).unwrap();
    let id = storage.create_new_trial(study).unwrap();
    let x = Distribution::uniform(-1.0, 1.0).unwrap();

    storage.set_trial_param(id, "x", 0.25, &x).unwrap();
    // Identical re-record is a no-op.
    storage.set_trial_param(id, "x", 0.25, &x).unwrap();
    assert!(matches!(
        storage.set_trial_param(id, "x", 0.5, &x),
        Err(Error::ParameterAlreadySet { .. })
    ));

    storage.set_trial_intermediate_value(id, 1, 3.0).unwrap();
    storage.set_trial_intermediate_value(id, 1, 2.5).unwrap();
    storage.set_trial_user_attr(id, "note", "first").unwrap();
    storage.set_trial_value(id, 0.0625).unwrap();
    storage.set_trial_state(id, TrialState::Complete).unwrap();

    let trial = storage.get_trial(id).unwrap();
    assert_eq!(trial.number, 0);
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value, Some(0.0625));
    assert_eq!(trial.params["x"].value, 0.25);
    assert_eq!(trial.params["x"].distribution, x);
    assert_eq!(trial.intermediate_values.get(&1), Some(&2.5));
    assert_eq!(trial.user_attrs["note"], "first");
    assert!(trial.datetime_complete.is_some());
    assert_eq!(
        storage.get_trial_param(id, "x").unwrap().map(|p| p.value),
        Some(0.25)
    );
    assert_eq!(storage.get_trial_param(id, "y").unwrap(), None);
}

pub fn finished_trials_reject_writes(storage: &dyn Storage) {
    let study = storage.create_new_study("done", Direction::Minimize).unwrap();
    let id = storage.create_new_trial(study).unwrap();
    storage
        .set_trial_system_attr(id, FAIL_REASON_ATTR, "diverged")
        .unwrap();
    storage.set_trial_state(id, TrialState::Failed).unwrap();

    let finished = |r: hyperstudy::Result<()>| {
        matches!(
            r,
            Err(Error::TrialAlreadyFinished {
                number: 0,
                state: TrialState::Failed
            })
        )
    };
    assert!(finished(storage.set_trial_value(id, 1.0)));
    assert!(finished(storage.set_trial_state(id, TrialState::Complete)));
    assert!(finished(storage.set_trial_intermediate_value(id, 0, 1.0)));
    assert!(finished(storage.set_trial_user_attr(id, "k", "v")));
    assert!(finished(storage.set_trial_param(
        id,
        "x",
        0.0,
        &Distribution::uniform(0.0, 1.0).unwrap()
    )));

    let trial = storage.get_trial(id).unwrap();
    assert_eq!(trial.fail_reason(), Some("diverged"));
    assert_eq!(trial.value, None);
}

pub fn study_wide_distribution_kind_is_enforced(storage: &dyn Storage) {
    let study = storage.create_new_study("kinds", Direction::Minimize).unwrap();
    let first = storage.create_new_trial(study).unwrap();
    let second = storage.create_new_trial(study).unwrap();
    storage
        .set_trial_param(first, "lr", 0.5, &Distribution::uniform(0.0, 1.0).unwrap())
        .unwrap();
    // Different bounds of the same kind are fine.
    storage
        .set_trial_param(second, "lr", 2.0, &Distribution::uniform(0.0, 4.0).unwrap())
        .unwrap();

    let third = storage.create_new_trial(study).unwrap();
    assert!(matches!(
        storage.set_trial_param(third, "lr", 1.0, &Distribution::int_uniform(0, 4).unwrap()),
        Err(Error::DistributionMismatch { name, .. }) if name == "lr"
    ));
}

pub fn rejected_params_do_not_register_a_kind(storage: &dyn Storage) {
    let study = storage.create_new_study("rejected", Direction::Minimize).unwrap();
    let finished = storage.create_new_trial(study).unwrap();
    storage.set_trial_state(finished, TrialState::Failed).unwrap();
    assert!(matches!(
        storage.set_trial_param(finished, "x", 0.5, &Distribution::uniform(0.0, 1.0).unwrap()),
        Err(Error::TrialAlreadyFinished { .. })
    ));

    let fresh = storage.create_new_trial(study).unwrap();
    storage
        .set_trial_param(fresh, "x", 3.0, &Distribution::int_uniform(0, 4).unwrap())
        .unwrap();
    assert_eq!(storage.get_trial_param(finished, "x").unwrap(), None);
    assert_eq!(
        storage.get_trial_param(fresh, "x").unwrap().map(|p| p.value),
        Some(3.0)
    );
}

pub fn best_trial_prefers_earliest_on_ties(storage: &dyn Storage) {
    let study = storage.create_new_study("ties", Direction::Maximize).unwrap();
    assert!(matches!(
        storage.get_best_trial(study),
        Err(Error::NoCompletedTrials)
    ));
    for value in [1.0, 4.0, 4.0, 3.0] {
        let id = storage.create_new_trial(study).unwrap();
        storage.set_trial_value(id, value).unwrap();
        storage.set_trial_state(id, TrialState::Complete).unwrap();
    }
    let pruned = storage.create_new_trial(study).unwrap();
    storage.set_trial_value(pruned, 99.0).unwrap();
    storage.set_trial_state(pruned, TrialState::Pruned).unwrap();

    let best = storage.get_best_trial(study).unwrap();
    assert_eq!(best.number, 1);
    assert_eq!(best.value, Some(4.0));
}

pub fn summaries_and_deletion(storage: &dyn Storage) {
    let keep = storage.create_new_study("keep", Direction::Minimize).unwrap();
    let drop = storage.create_new_study("drop", Direction::Minimize).unwrap();
    storage.set_study_user_attr(keep, "dataset", "mnist").unwrap();
    let id = storage.create_new_trial(keep).unwrap();
    storage.set_trial_value(id, 0.3).unwrap();
    storage.set_trial_state(id, TrialState::Complete).unwrap();
    storage.create_new_trial(keep).unwrap();
    storage.create_new_trial(drop).unwrap();

    storage.delete_study(drop).unwrap();
    assert!(matches!(
        storage.get_study_id_from_name("drop"),
        Err(Error::StudyNotFound(_))
    ));
    assert!(matches!(
        storage.get_all_trials(drop),
        Err(Error::StudyNotFound(_))
    ));

    let summaries = storage.get_all_study_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.name, "keep");
    assert_eq!(summary.n_trials, 2);
    assert_eq!(summary.best_trial.as_ref().and_then(|t| t.value), Some(0.3));
    assert!(summary.datetime_start.is_some());
    assert_eq!(summary.user_attrs["dataset"], "mnist");

    // The name is free again.
    storage.create_new_study("drop", Direction::Maximize).unwrap();
}

pub fn concurrent_trial_numbers_are_unique(storage: Arc<dyn Storage>) {
    let study = storage.create_new_study("race", Direction::Minimize).unwrap();
    let numbers: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = &storage;
                scope.spawn(move || {
                    (0..25)
                        .map(|_| {
                            let id = storage.create_new_trial(study).unwrap();
                            storage.get_trial_number_from_id(id).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<u64> = numbers.iter().copied().collect();
    assert_eq!(unique.len(), 200);
    assert_eq!(unique, (0..200).collect());

    let trials = storage.get_all_trials(study).unwrap();
    let ordered: Vec<u64> = trials.iter().map(|t| t.number).collect();
    assert_eq!(ordered, (0..200).collect::<Vec<_>>());
}
