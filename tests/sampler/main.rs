#![allow(clippy::cast_sign_loss, clippy::cast_precision_loss, clippy::cast_possible_truncation)]

mod random;

use hyperstudy::{Distribution, FrozenTrial, TrialParam, TrialState};

/// A complete trial that recorded `x` under `distribution`.
pub fn observed(number: u64, x: f64, value: f64, distribution: &Distribution) -> FrozenTrial {
    let mut trial = FrozenTrial::new_running(number, 0, number);
    trial.state = TrialState::Complete;
    trial.value = Some(value);
    trial.params.insert(
        "x".to_owned(),
        TrialParam {
            value: x,
            distribution: distribution.clone(),
        },
    );
    trial
}

/// The running trial a sampler is asked about.
pub fn current(number: u64) -> FrozenTrial {
    FrozenTrial::new_running(number, 0, number)
}
