use std::collections::HashSet;

use hyperstudy::prelude::*;

use crate::current;

fn draw_many(sampler: &RandomSampler, d: &Distribution, n: usize) -> Vec<f64> {
    let trial = current(0);
    (0..n)
        .map(|_| sampler.sample(Direction::Minimize, &trial, "x", d, &[]))
        .collect()
}

#[test]
fn same_seed_same_sequence() {
    let d = Distribution::uniform(-3.0, 3.0).unwrap();
    let a = draw_many(&RandomSampler::with_seed(7), &d, 20);
    let b = draw_many(&RandomSampler::with_seed(7), &d, 20);
    let c = draw_many(&RandomSampler::with_seed(8), &d, 20);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn every_kind_stays_in_domain() {
    let sampler = RandomSampler::with_seed(1);
    let distributions = [
        Distribution::uniform(-1.0, 2.0).unwrap(),
        Distribution::log_uniform(1e-4, 1e-1).unwrap(),
        Distribution::int_uniform(-5, 5).unwrap(),
        Distribution::discrete_uniform(0.5, 5.5, 0.5).unwrap(),
        Distribution::categorical(["a", "b", "c"]).unwrap(),
    ];
    for d in &distributions {
        for v in draw_many(&sampler, d, 300) {
            assert!(d.contains(v), "{v} outside {d:?}");
        }
    }
}

#[test]
fn int_and_categorical_reach_every_value() {
    let sampler = RandomSampler::with_seed(3);
    let ints = Distribution::int_uniform(0, 4).unwrap();
    let seen: HashSet<i64> = draw_many(&sampler, &ints, 400)
        .into_iter()
        .map(|v| v as i64)
        .collect();
    assert_eq!(seen, (0..=4).collect());

    let choices = Distribution::categorical(["x", "y", "z"]).unwrap();
    let seen: HashSet<i64> = draw_many(&sampler, &choices, 200)
        .into_iter()
        .map(|v| v as i64)
        .collect();
    assert_eq!(seen.len(), 3);
}

#[test]
fn single_distributions_return_their_value() {
    let sampler = RandomSampler::with_seed(0);
    let d = Distribution::uniform(4.5, 4.5).unwrap();
    assert!(draw_many(&sampler, &d, 5).iter().all(|&v| v == 4.5));
    let d = Distribution::categorical(["only"]).unwrap();
    assert!(draw_many(&sampler, &d, 5).iter().all(|&v| v == 0.0));
}

#[test]
fn drives_a_study() {
    let study = Study::builder()
        .sampler(RandomSampler::with_seed(11))
        .build()
        .unwrap();
    study
        .optimize(25, |trial: &Trial| {
            let x = trial.suggest_float("x", -2.0, 2.0)?;
            let n = trial.suggest_int("n", 1, 3)?;
            let act = trial.suggest_categorical("act", ["relu", "tanh"])?;
            assert!((1..=3).contains(&n));
            assert!(act == "relu" || act == "tanh");
            Ok::<_, Error>(x * x)
        })
        .unwrap();
    assert_eq!(study.n_trials_with_state(TrialState::Complete).unwrap(), 25);
}
