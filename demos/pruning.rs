//! Trial pruning: stop unpromising trials early with `MedianPruner`.
//!
//! The objective reports a loss after every epoch; the pruner compares it
//! with what completed trials reported at the same epoch.
//!
//! Run with: `cargo run --example pruning`

use hyperstudy::prelude::*;

fn main() -> hyperstudy::Result<()> {
    let study = Study::builder()
        .minimize()
        .sampler(RandomSampler::with_seed(42))
        .pruner(MedianPruner::new().n_startup_trials(5).n_warmup_steps(3))
        .build()?;

    let n_epochs: u32 = 20;

    study.optimize(40, |trial: &Trial| -> Result<f64> {
        let lr = trial.suggest_log_float("learning_rate", 1e-4, 1.0)?;
        let momentum = trial.suggest_float("momentum", 0.0, 0.99)?;

        // Good hyperparameters converge to a low loss, bad ones plateau.
        let base = 0.02 + 0.05 * (lr.log10() + 2.0).powi(2) + 1.5 * (momentum - 0.8).powi(2);
        let mut loss = 1.0;
        for epoch in 0..n_epochs {
            let progress = f64::from(epoch + 1) / f64::from(n_epochs);
            loss = base + (1.0 - base) * (-3.5 * progress).exp();
            trial.report(u64::from(epoch), loss)?;
            if trial.should_prune()? {
                Err(TrialPruned)?;
            }
        }
        Ok(loss)
    })?;

    println!(
        "complete: {}, pruned: {}",
        study.n_trials_with_state(TrialState::Complete)?,
        study.n_trials_with_state(TrialState::Pruned)?,
    );
    println!("best loss: {:.5}", study.best_value()?);
    for (name, value) in study.best_params()? {
        println!("  {name} = {value}");
    }
    Ok(())
}
