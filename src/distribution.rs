//! Parameter distributions and their internal/external representations.
//!
//! Every parameter is sampled as a plain `f64` (the *internal* representation)
//! and handed to the objective function as a [`ParamValue`] (the *external*
//! representation). For numeric ranges both are the same number; for
//! [`Categorical`](Distribution::Categorical) the internal value is the
//! zero-based index of the choice.
//!
//! Distributions serialize to a tagged JSON form:
//!
//! ```
//! use hyperstudy::distribution::{Distribution, distribution_from_json, distribution_to_json};
//!
//! let d = Distribution::uniform(-5.0, 10.0).unwrap();
//! let json = distribution_to_json(&d).unwrap();
//! assert_eq!(json, r#"{"kind":"uniform","attributes":{"low":-5.0,"high":10.0}}"#);
//! assert_eq!(distribution_from_json(&json).unwrap(), d);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tags accepted by [`distribution_from_json`].
const KNOWN_KINDS: [&str; 5] = [
    "uniform",
    "loguniform",
    "intuniform",
    "discreteuniform",
    "categorical",
];

/// A continuous range `[low, high]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// A continuous range `[low, high]` sampled uniformly in log space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogUniformDistribution {
    /// Lower bound (inclusive, positive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// An integer range `[low, high]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntUniformDistribution {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
}

/// A range `[low, high]` quantized to `low + k * q`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscreteUniformDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
    /// Quantization step.
    pub q: f64,
}

/// An ordered set of labelled choices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDistribution {
    /// The available choices, indexed by their internal representation.
    pub choices: Vec<String>,
}

/// The domain of a single parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attributes", rename_all = "lowercase")]
pub enum Distribution {
    /// Continuous uniform range.
    Uniform(UniformDistribution),
    /// Continuous log-uniform range.
    LogUniform(LogUniformDistribution),
    /// Integer range.
    IntUniform(IntUniformDistribution),
    /// Quantized continuous range.
    DiscreteUniform(DiscreteUniformDistribution),
    /// Categorical choices.
    Categorical(CategoricalDistribution),
}

/// The user-facing value of a suggested parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer parameter value.
    Int(i64),
    /// A floating-point parameter value.
    Float(f64),
    /// The label of a categorical choice.
    Categorical(String),
}

impl ParamValue {
    /// Returns the value as `f64` for numeric variants.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Categorical(_) => None,
        }
    }

    /// Returns the value as `i64` for the integer variant.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the label for the categorical variant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Categorical(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Categorical(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Categorical(v.to_owned())
    }
}

impl DiscreteUniformDistribution {
    /// Index of the last grid point that does not exceed `high`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn max_index(&self) -> i64 {
        ((self.high - self.low) / self.q + 1e-9).floor().max(0.0) as i64
    }

    /// Snaps `value` to the nearest grid point `low + k * q` inside `[low, high]`.
    ///
    /// Halfway values round away from zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn quantize(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.low;
        }
        let k = ((value - self.low) / self.q).round() as i64;
        let k = k.clamp(0, self.max_index());
        (self.low + k as f64 * self.q).min(self.high)
    }
}

impl Distribution {
    /// Creates a validated uniform distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `low > high` or a bound is not finite.
    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        let d = Distribution::Uniform(UniformDistribution { low, high });
        d.validate()?;
        Ok(d)
    }

    /// Creates a validated log-uniform distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] or [`Error::InvalidLogBounds`].
    pub fn log_uniform(low: f64, high: f64) -> Result<Self> {
        let d = Distribution::LogUniform(LogUniformDistribution { low, high });
        d.validate()?;
        Ok(d)
    }

    /// Creates a validated integer distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `low > high`.
    pub fn int_uniform(low: i64, high: i64) -> Result<Self> {
        let d = Distribution::IntUniform(IntUniformDistribution { low, high });
        d.validate()?;
        Ok(d)
    }

    /// Creates a validated quantized distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] or [`Error::InvalidStep`].
    pub fn discrete_uniform(low: f64, high: f64, q: f64) -> Result<Self> {
        let d = Distribution::DiscreteUniform(DiscreteUniformDistribution { low, high, q });
        d.validate()?;
        Ok(d)
    }

    /// Creates a validated categorical distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyChoices`] if `choices` is empty.
    pub fn categorical<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Result<Self> {
        let d = Distribution::Categorical(CategoricalDistribution {
            choices: choices.into_iter().map(Into::into).collect(),
        });
        d.validate()?;
        Ok(d)
    }

    /// Checks the distribution's invariants.
    ///
    /// # Errors
    ///
    /// Returns the matching bounds/step/choices error when an invariant is violated.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<()> {
        fn check_range(low: f64, high: f64) -> Result<()> {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(Error::InvalidBounds { low, high });
            }
            Ok(())
        }

        match self {
            Distribution::Uniform(d) => check_range(d.low, d.high),
            Distribution::LogUniform(d) => {
                check_range(d.low, d.high)?;
                if d.low <= 0.0 {
                    return Err(Error::InvalidLogBounds);
                }
                Ok(())
            }
            Distribution::IntUniform(d) => check_range(d.low as f64, d.high as f64),
            Distribution::DiscreteUniform(d) => {
                check_range(d.low, d.high)?;
                if !(d.q.is_finite() && d.q > 0.0) {
                    return Err(Error::InvalidStep);
                }
                Ok(())
            }
            Distribution::Categorical(d) => {
                if d.choices.is_empty() {
                    return Err(Error::EmptyChoices);
                }
                Ok(())
            }
        }
    }

    /// The serialization tag of this distribution.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Distribution::Uniform(_) => "uniform",
            Distribution::LogUniform(_) => "loguniform",
            Distribution::IntUniform(_) => "intuniform",
            Distribution::DiscreteUniform(_) => "discreteuniform",
            Distribution::Categorical(_) => "categorical",
        }
    }

    /// Returns `true` if `ir` is a valid internal value of this distribution.
    ///
    /// Numeric distributions check the closed range; categorical checks that
    /// `ir` is an integral index into the choices. Quantized ranges do not
    /// check the grid: off-grid values are snapped by
    /// [`to_internal_repr`](Self::to_internal_repr) and by samplers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contains(&self, ir: f64) -> bool {
        match self {
            Distribution::Uniform(d) => d.low <= ir && ir <= d.high,
            Distribution::LogUniform(d) => d.low <= ir && ir <= d.high,
            Distribution::IntUniform(d) => d.low as f64 <= ir && ir <= d.high as f64,
            Distribution::DiscreteUniform(d) => d.low <= ir && ir <= d.high,
            Distribution::Categorical(d) => {
                ir >= 0.0 && ir.fract() == 0.0 && ir < d.choices.len() as f64
            }
        }
    }

    /// Converts an internal value into the value handed to the objective.
    ///
    /// Integer values are rounded, quantized values are snapped onto the grid
    /// and categorical indices are clamped into the choice list.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn to_external_repr(&self, ir: f64) -> ParamValue {
        match self {
            Distribution::Uniform(_) | Distribution::LogUniform(_) => ParamValue::Float(ir),
            Distribution::IntUniform(d) => ParamValue::Int((ir.round() as i64).clamp(d.low, d.high)),
            Distribution::DiscreteUniform(d) => ParamValue::Float(d.quantize(ir)),
            Distribution::Categorical(d) => {
                let idx = (ir.round().max(0.0) as usize).min(d.choices.len().saturating_sub(1));
                ParamValue::Categorical(d.choices.get(idx).cloned().unwrap_or_default())
            }
        }
    }

    /// Converts a user-facing value into its internal representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleValue`] if the value's type does not fit
    /// the distribution or a categorical label is not among the choices.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_internal_repr(&self, value: &ParamValue) -> Result<f64> {
        match (self, value) {
            (Distribution::Uniform(_) | Distribution::LogUniform(_), v) => v
                .as_f64()
                .ok_or_else(|| Error::IncompatibleValue(format!("expected a number, got {v}"))),
            (Distribution::IntUniform(_), ParamValue::Int(i)) => Ok(*i as f64),
            (Distribution::IntUniform(_), ParamValue::Float(f)) => Ok(f.round()),
            (Distribution::DiscreteUniform(d), v) => v
                .as_f64()
                .map(|f| d.quantize(f))
                .ok_or_else(|| Error::IncompatibleValue(format!("expected a number, got {v}"))),
            (Distribution::Categorical(d), ParamValue::Categorical(label)) => d
                .choices
                .iter()
                .position(|c| c == label)
                .map(|i| i as f64)
                .ok_or_else(|| {
                    Error::IncompatibleValue(format!("'{label}' is not one of {:?}", d.choices))
                }),
            (d, v) => Err(Error::IncompatibleValue(format!(
                "{v} cannot be used with a {} distribution",
                d.kind()
            ))),
        }
    }

    /// Returns `true` if the distribution can only ever produce one value.
    #[must_use]
    pub fn single(&self) -> bool {
        match self {
            Distribution::Uniform(d) => d.low == d.high,
            Distribution::LogUniform(d) => d.low == d.high,
            Distribution::IntUniform(d) => d.low == d.high,
            Distribution::DiscreteUniform(d) => d.low == d.high || d.high - d.low < d.q,
            Distribution::Categorical(d) => d.choices.len() == 1,
        }
    }

    /// The only internal value of a [`single`](Self::single) distribution.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn single_value(&self) -> Option<f64> {
        if !self.single() {
            return None;
        }
        Some(match self {
            Distribution::Uniform(d) => d.low,
            Distribution::LogUniform(d) => d.low,
            Distribution::IntUniform(d) => d.low as f64,
            Distribution::DiscreteUniform(d) => d.low,
            Distribution::Categorical(_) => 0.0,
        })
    }

    /// Returns `true` if values recorded under `other` can be compared with
    /// values drawn from `self`: same kind, and identical choices for
    /// categorical distributions.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Distribution) -> bool {
        match (self, other) {
            (Distribution::Categorical(a), Distribution::Categorical(b)) => a.choices == b.choices,
            (a, b) => a.kind() == b.kind(),
        }
    }
}

/// Serializes a distribution into its tagged JSON representation.
///
/// # Errors
///
/// Returns [`Error::InvalidDistribution`] if serialization fails (e.g. a
/// non-finite bound).
pub fn distribution_to_json(distribution: &Distribution) -> Result<String> {
    serde_json::to_string(distribution).map_err(|e| Error::InvalidDistribution(e.to_string()))
}

/// Parses a distribution from its tagged JSON representation.
///
/// # Errors
///
/// Returns [`Error::UnknownDistributionKind`] for an unrecognized `kind` tag
/// and [`Error::InvalidDistribution`] for malformed input or attributes that
/// violate the distribution's invariants.
pub fn distribution_from_json(json: &str) -> Result<Distribution> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Error::InvalidDistribution(e.to_string()))?;

    let kind = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::InvalidDistribution("missing \"kind\" tag".to_owned()))?;
    if !KNOWN_KINDS.contains(&kind) {
        return Err(Error::UnknownDistributionKind(kind.to_owned()));
    }

    let distribution: Distribution =
        serde_json::from_value(value).map_err(|e| Error::InvalidDistribution(e.to_string()))?;
    distribution
        .validate()
        .map_err(|e| Error::InvalidDistribution(e.to_string()))?;
    Ok(distribution)
}
