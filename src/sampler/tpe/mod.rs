//! Tree-structured Parzen Estimator (TPE) sampler.
//!
//! TPE models `P(x | y)` rather than `P(y | x)`. It splits finished trials
//! into a "good" group and the rest, fits a Parzen estimator to each, and
//! proposes the candidate that maximizes `l(x) / g(x)`.
//!
//! # Gamma strategies
//!
//! The [`GammaStrategy`] decides how many ranked trials are "good":
//!
//! | Strategy | Good trials out of `n` |
//! |----------|------------------------|
//! | [`DefaultGamma`] | `min(ceil(0.1 n), 25)` |
//! | [`FixedGamma`] | `ceil(fraction * n)` |
//! | [`SqrtGamma`] | `min(ceil(factor * sqrt(n)), cap)` |
//!
//! # Examples
//!
//! ```
//! use hyperstudy::prelude::*;
//! use hyperstudy::sampler::tpe::{SqrtGamma, TpeSampler};
//!
//! let sampler = TpeSampler::builder()
//!     .gamma_strategy(SqrtGamma::default())
//!     .n_startup_trials(5)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! let study = Study::builder().minimize().sampler(sampler).build().unwrap();
//! study
//!     .optimize(20, |trial: &Trial| {
//!         let x = trial.suggest_float("x", -5.0, 5.0)?;
//!         Ok::<_, Error>(x * x)
//!     })
//!     .unwrap();
//! assert_eq!(study.n_trials().unwrap(), 20);
//! ```

mod gamma;
mod sampler;

pub use gamma::{DefaultGamma, FixedGamma, GammaStrategy, SqrtGamma};
pub use sampler::{TpeSampler, TpeSamplerBuilder};
