//! Kernel density estimation used by the TPE sampler.

mod parzen;

pub(crate) use parzen::{ParzenConfig, ParzenEstimator, categorical_pmf};
