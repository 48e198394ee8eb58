//! Several threads optimizing one study at the same time.
//!
//! Five threads share a single TPE study and each runs its own `optimize`
//! loop. Trial numbers stay unique and gap-free because the storage hands
//! them out.
//!
//! Run with: `cargo run --example concurrency`

use std::thread;

use hyperstudy::prelude::*;

fn objective(trial: &Trial) -> Result<f64> {
    let x1 = trial.suggest_float("x1", -10.0, 10.0)?;
    let x2 = trial.suggest_float("x2", -10.0, 10.0)?;
    Ok((x1 - 2.0).powi(2) + (x2 + 5.0).powi(2))
}

fn main() -> hyperstudy::Result<()> {
    let study = Study::builder()
        .name("concurrency-demo")
        .minimize()
        .sampler(TpeSampler::builder().seed(42).build()?)
        .build()?;

    let n_threads = 5;
    let trials_per_thread = 40;
    println!("Running {trials_per_thread} trials on each of {n_threads} threads...");

    thread::scope(|scope| {
        let handles: Vec<_> = (0..n_threads)
            .map(|_| scope.spawn(|| study.optimize(trials_per_thread, objective)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("optimizer thread panicked"))
            .collect::<hyperstudy::Result<()>>()
    })?;

    let best = study.best_trial()?;
    println!(
        "{} trials, best #{}: f({}, {}) = {:.6}",
        study.n_trials()?,
        best.number,
        best.param("x1").unwrap_or(ParamValue::Float(f64::NAN)),
        best.param("x2").unwrap_or(ParamValue::Float(f64::NAN)),
        best.value.unwrap_or(f64::NAN),
    );

    Ok(())
}
