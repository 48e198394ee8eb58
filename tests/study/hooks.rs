use core::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hyperstudy::prelude::*;

/// Scores `10 - number`; stops once a score drops below `stop_below`.
struct Countdown {
    stop_below: f64,
    hook_calls: Arc<AtomicUsize>,
}

impl Countdown {
    fn new(stop_below: f64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let objective = Self {
            stop_below,
            hook_calls: Arc::clone(&calls),
        };
        (objective, calls)
    }
}

impl Objective for Countdown {
    type Error = String;

    fn evaluate(&self, trial: &Trial) -> core::result::Result<f64, String> {
        if trial.number() % 2 == 1 && self.stop_below < 0.0 {
            return Err(format!("odd trial {}", trial.number()));
        }
        Ok(10.0 - trial.number() as f64)
    }

    fn after_trial(&self, _study: &Study, trial: &FrozenTrial) -> ControlFlow<()> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        match trial.value {
            Some(v) if v < self.stop_below => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }
}

#[test]
fn break_stops_sequential_optimization() {
    let study = Study::builder().build().unwrap();
    let (objective, calls) = Countdown::new(7.0);
    study.optimize(100, objective).unwrap();
    // Trial 4 scores 6.0.
    assert_eq!(study.n_trials().unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn hook_only_sees_completed_trials() {
    let study = Study::builder().build().unwrap();
    // A negative threshold never breaks and fails every odd trial.
    let (objective, calls) = Countdown::new(-1.0);
    study.optimize(10, objective).unwrap();
    assert_eq!(study.n_trials().unwrap(), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn break_stops_parallel_optimization() {
    let study = Study::builder().build().unwrap();
    let (objective, calls) = Countdown::new(100.0);
    study.optimize_parallel(1_000, 4, objective).unwrap();
    let n = study.n_trials().unwrap();
    assert!((1..=4).contains(&n), "{n} trials ran");
    assert_eq!(calls.load(Ordering::SeqCst), n);
    assert_eq!(study.n_trials_with_state(TrialState::Running).unwrap(), 0);
}

#[test]
fn hook_can_read_the_study() {
    struct StopAfterThreeCompleted;

    impl Objective for StopAfterThreeCompleted {
        type Error = Error;

        fn evaluate(&self, trial: &Trial) -> Result<f64> {
            trial.suggest_float("x", 0.0, 1.0)
        }

        fn after_trial(&self, study: &Study, _trial: &FrozenTrial) -> ControlFlow<()> {
            match study.n_trials_with_state(TrialState::Complete) {
                Ok(n) if n >= 3 => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        }
    }

    let study = Study::builder().build().unwrap();
    study.optimize(50, StopAfterThreeCompleted).unwrap();
    assert_eq!(study.n_trials().unwrap(), 3);
}
