//! Ask-and-tell: drive trials by hand instead of handing over a closure.
//!
//! Useful when evaluations happen somewhere the closure cannot reach, such
//! as a job queue or another process.
//!
//! Run with: `cargo run --example ask_and_tell`

use hyperstudy::prelude::*;

fn main() -> hyperstudy::Result<()> {
    let study = Study::builder()
        .maximize()
        .sampler(TpeSampler::builder().seed(7).n_startup_trials(5).build()?)
        .build()?;

    // Hand out a batch of configurations first...
    let mut pending = Vec::new();
    for _ in 0..4 {
        let trial = study.ask()?;
        let depth = trial.suggest_int("depth", 2, 12)?;
        let booster = trial.suggest_categorical("booster", ["gbtree", "dart"])?;
        pending.push((trial, depth, booster));
    }

    // ...then report results as they come back.
    for (trial, depth, booster) in pending {
        let bonus = if booster == "dart" { 0.02 } else { 0.0 };
        let accuracy = 0.9 - 0.004 * (depth - 7).pow(2) as f64 + bonus;
        study.tell(trial, TrialOutcome::Complete(accuracy))?;
    }

    // A failed evaluation is recorded with its reason.
    let trial = study.ask()?;
    study.tell(trial, TrialOutcome::Failed("worker lost".into()))?;

    let best = study.best_trial()?;
    println!("best accuracy {:.3} with {:?}", best.value.unwrap_or_default(), best.external_params());
    for t in study.trials()? {
        println!("#{} {:?} {:?}", t.number, t.state, t.fail_reason());
    }
    Ok(())
}
