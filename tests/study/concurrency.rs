use std::sync::Arc;
use std::thread;

use hyperstudy::prelude::*;

use crate::numbers;

fn quadratic(trial: &Trial) -> Result<f64> {
    let x1 = trial.suggest_float("x1", -10.0, 10.0)?;
    let x2 = trial.suggest_float("x2", -10.0, 10.0)?;
    Ok((x1 - 2.0).powi(2) + (x2 + 5.0).powi(2))
}

#[test]
fn sequential_numbers_are_dense() {
    let study = Study::builder().build().unwrap();
    study.optimize(10, quadratic).unwrap();
    assert_eq!(numbers(&study), (0..10).collect::<Vec<_>>());
}

#[test]
fn parallel_numbers_are_dense() {
    let study = Study::builder()
        .sampler(TpeSampler::builder().seed(1).build().unwrap())
        .build()
        .unwrap();
    study.optimize_parallel(50, 8, quadratic).unwrap();
    assert_eq!(numbers(&study), (0..50).collect::<Vec<_>>());
    assert_eq!(study.n_trials_with_state(TrialState::Complete).unwrap(), 50);
}

#[test]
fn zero_concurrency_means_one_worker_per_trial() {
    let study = Study::builder().build().unwrap();
    study.optimize_parallel(12, 0, quadratic).unwrap();
    assert_eq!(numbers(&study), (0..12).collect::<Vec<_>>());
}

#[test]
fn one_study_driven_from_five_threads() {
    let study = Study::builder()
        .sampler(TpeSampler::builder().seed(7).build().unwrap())
        .build()
        .unwrap();
    thread::scope(|scope| {
        for _ in 0..5 {
            scope.spawn(|| study.optimize(20, quadratic).unwrap());
        }
    });
    assert_eq!(numbers(&study), (0..100).collect::<Vec<_>>());
    assert!(study.best_value().unwrap() < 20.0);
}

#[test]
fn separate_handles_share_one_study() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    thread::scope(|scope| {
        for seed in 0..4 {
            let storage = Arc::clone(&storage);
            scope.spawn(move || {
                let study = Study::builder()
                    .name("shared")
                    .sampler(TpeSampler::builder().seed(seed).build().unwrap())
                    .storage(storage)
                    .build()
                    .unwrap();
                study.optimize(15, quadratic).unwrap();
            });
        }
    });

    let study = Study::load("shared", storage).unwrap();
    assert_eq!(numbers(&study), (0..60).collect::<Vec<_>>());
}
