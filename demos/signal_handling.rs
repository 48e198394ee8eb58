//! Graceful shutdown of a persistent study.
//!
//! The study lives in an SQLite file, so it can be stopped and resumed.
//! A watchdog thread plays the role of a Ctrl-C handler: it cancels the
//! study's token, running objectives notice through `ensure_active`, and
//! `optimize_parallel` returns once in-flight trials have been recorded.
//! Running the demo again resumes where the previous run stopped.
//!
//! Run with: `cargo run --example signal_handling`

use std::thread;
use std::time::Duration;

use hyperstudy::prelude::*;

fn main() -> hyperstudy::Result<()> {
    let path = std::env::temp_dir().join("hyperstudy-signal-demo.db");
    let storage = std::sync::Arc::new(SqliteStorage::new(&path)?);

    let token = CancellationToken::new();
    let study = Study::builder()
        .name("signal-demo")
        .minimize()
        .storage(storage)
        .sampler(TpeSampler::new())
        .cancellation(token.clone())
        .build()?;
    let before = study.n_trials()?;
    println!("{}: {before} trials already recorded", path.display());

    let watchdog = thread::spawn(move || {
        thread::sleep(Duration::from_millis(500));
        println!("stop requested");
        token.cancel();
    });

    study.optimize_parallel(10_000, 4, |trial: &Trial| -> Result<f64> {
        let x = trial.suggest_float("x", -10.0, 10.0)?;
        let mut loss = 100.0;
        for epoch in 0..10u32 {
            // Bail out between epochs once the study is stopped; the trial
            // is recorded as pruned.
            trial.ensure_active()?;
            thread::sleep(Duration::from_millis(5));
            loss = (x - 2.0).powi(2) + 10.0 / f64::from(epoch + 1);
            trial.report(u64::from(epoch), loss)?;
        }
        Ok(loss)
    })?;
    watchdog.join().expect("watchdog panicked");

    println!(
        "ran {} new trials ({} complete, {} pruned in flight), best so far {:.4}",
        study.n_trials()? - before,
        study.n_trials_with_state(TrialState::Complete)?,
        study.n_trials_with_state(TrialState::Pruned)?,
        study.best_value()?,
    );
    Ok(())
}
