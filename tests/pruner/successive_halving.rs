use hyperstudy::prelude::*;

use crate::run_curve;

fn pruner() -> SuccessiveHalvingPruner {
    SuccessiveHalvingPruner::new()
        .min_resource(1)
        .reduction_factor(2)
        .max_resource(8)
}

#[test]
fn keeps_the_top_half_at_each_rung() {
    let study = Study::builder().minimize().pruner(pruner()).build().unwrap();
    // Two siblings are needed before rung 1 can judge anyone.
    for v in [1.0, 2.0] {
        assert_eq!(run_curve(&study, &[v; 9]).state, TrialState::Complete);
    }

    let worst = run_curve(&study, &[3.0; 9]);
    assert_eq!(worst.state, TrialState::Pruned);
    assert_eq!(worst.last_step(), Some(1));

    let best = run_curve(&study, &[0.5; 9]);
    assert_eq!(best.state, TrialState::Complete);
}

#[test]
fn late_bloomer_is_judged_at_later_rungs() {
    let study = Study::builder().minimize().pruner(pruner()).build().unwrap();
    for v in [1.0, 2.0] {
        run_curve(&study, &[v; 9]);
    }
    // Fine at rungs 1 and 2, worst at rung 4.
    let curve = [0.1, 0.1, 0.1, 0.1, 5.0, 5.0, 5.0, 5.0, 5.0];
    let trial = run_curve(&study, &curve);
    assert_eq!(trial.state, TrialState::Pruned);
    assert_eq!(trial.last_step(), Some(4));
}

#[test]
fn the_full_budget_rung_never_prunes() {
    let study = Study::builder()
        .minimize()
        .pruner(pruner().min_early_stopping_rate(3))
        .build()
        .unwrap();
    for v in [1.0, 2.0] {
        run_curve(&study, &[v; 9]);
    }
    // With the first three rungs skipped only the step-8 rung is left.
    assert_eq!(run_curve(&study, &[9.0; 9]).state, TrialState::Complete);
}
