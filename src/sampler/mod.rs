//! Sampler trait and implementations for parameter sampling.

pub mod random;
pub mod tpe;

pub use random::RandomSampler;
pub use tpe::TpeSampler;

use crate::distribution::Distribution;
use crate::frozen::FrozenTrial;
use crate::types::Direction;

/// Trait for pluggable parameter sampling strategies.
///
/// A sampler picks the next *internal* value for one parameter of a running
/// trial. It receives a fresh snapshot of the study's other trials on every
/// call and must not cache anything derived from it: other workers or other
/// processes may have finished trials in the meantime.
///
/// The trait requires `Send + Sync` because a single sampler is shared by
/// every worker of a study.
///
/// # Contract
///
/// - The returned value must satisfy `distribution.contains(value)`.
/// - Sampling never fails. For a [`single`](Distribution::single)
///   distribution the only valid value is returned without touching the RNG.
pub trait Sampler: Send + Sync {
    /// Samples an internal value for `param_name` in `trial`.
    ///
    /// `history` holds every other trial of the study, in any state, ordered
    /// by trial number.
    fn sample(
        &self,
        direction: Direction,
        trial: &FrozenTrial,
        param_name: &str,
        distribution: &Distribution,
        history: &[FrozenTrial],
    ) -> f64;
}

/// Clamps and rounds a raw draw back into the distribution's domain.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn snap_to_domain(distribution: &Distribution, value: f64) -> f64 {
    match distribution {
        Distribution::Uniform(d) => value.clamp(d.low, d.high),
        Distribution::LogUniform(d) => value.clamp(d.low, d.high),
        Distribution::IntUniform(d) => value.round().clamp(d.low as f64, d.high as f64),
        Distribution::DiscreteUniform(d) => d.quantize(value),
        Distribution::Categorical(d) => {
            let last = d.choices.len().saturating_sub(1) as f64;
            if value.is_finite() {
                value.round().clamp(0.0, last)
            } else {
                0.0
            }
        }
    }
}

/// Values of `param_name` recorded by trials using a compatible distribution.
pub(crate) fn recorded_value(
    trial: &FrozenTrial,
    param_name: &str,
    distribution: &Distribution,
) -> Option<f64> {
    trial
        .params
        .get(param_name)
        .filter(|p| p.distribution.is_compatible_with(distribution))
        .map(|p| p.value)
}
