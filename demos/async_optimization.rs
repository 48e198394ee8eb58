//! Async optimization: evaluate trials on tokio's blocking pool.
//!
//! `optimize_async` keeps up to `concurrency` evaluations in flight while
//! the runtime stays free for other work.
//!
//! Run with: `cargo run --example async_optimization --features async`

use std::time::Duration;

use hyperstudy::prelude::*;

#[tokio::main]
async fn main() -> hyperstudy::Result<()> {
    let study = Study::builder()
        .minimize()
        .sampler(TpeSampler::new())
        .build()?;

    let n_trials = 30;
    let concurrency = 4;
    println!("Running {n_trials} trials with {concurrency} in flight...");

    study
        .optimize_async(n_trials, concurrency, |trial: &Trial| {
            let x = trial.suggest_float("x", -5.0, 5.0)?;
            let y = trial.suggest_float("y", -5.0, 5.0)?;
            // Simulate a slow, blocking evaluation.
            std::thread::sleep(Duration::from_millis(10));
            Ok::<_, Error>(x * x + y * y)
        })
        .await?;

    let best = study.best_trial()?;
    println!(
        "best #{}: {:?} -> {:.6}",
        best.number,
        best.external_params(),
        best.value.unwrap_or(f64::NAN)
    );
    Ok(())
}
