use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hyperstudy::prelude::*;

use crate::run_curve;

/// Prunes at step 2 and counts how much history it was shown.
struct StepTwo {
    calls: Arc<AtomicUsize>,
    seen: Arc<AtomicUsize>,
}

impl Pruner for StepTwo {
    fn should_prune(&self, _: Direction, trial: &FrozenTrial, history: &[FrozenTrial]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.store(history.len(), Ordering::SeqCst);
        assert!(history.iter().all(|t| t.id != trial.id));
        trial.last_step() == Some(2)
    }
}

#[test]
fn study_consults_a_user_pruner() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(AtomicUsize::new(0));
    let study = Study::builder()
        .pruner(StepTwo {
            calls: Arc::clone(&calls),
            seen: Arc::clone(&seen),
        })
        .build()
        .unwrap();

    run_curve(&study, &[1.0, 1.0]);
    run_curve(&study, &[1.0, 1.0]);
    let trial = run_curve(&study, &[3.0, 2.0, 1.0, 0.0]);

    assert_eq!(trial.state, TrialState::Pruned);
    assert_eq!(trial.value, Some(1.0));
    assert_eq!(calls.load(Ordering::SeqCst), 7);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn nop_pruner_never_prunes() {
    let study = Study::builder().pruner(NopPruner).build().unwrap();
    let trial = run_curve(&study, &[1e9, 1e12, 1e15]);
    assert_eq!(trial.state, TrialState::Complete);
}
