//! Immutable snapshots of trials and studies as recorded by storage.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distribution::{Distribution, ParamValue};
use crate::types::{Direction, StudyId, TrialId, TrialState};

/// System attribute under which a failed trial records its reason.
pub const FAIL_REASON_ATTR: &str = "fail_reason";

/// A recorded parameter: its internal value and the distribution it was drawn from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialParam {
    /// Internal representation of the value.
    pub value: f64,
    /// The distribution the value belongs to.
    pub distribution: Distribution,
}

impl TrialParam {
    /// The value as handed to the objective function.
    #[must_use]
    pub fn external(&self) -> ParamValue {
        self.distribution.to_external_repr(self.value)
    }
}

/// A snapshot of one trial.
///
/// Storage backends own the live record; a `FrozenTrial` is a copy taken at
/// read time and never written back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    /// Backend-wide unique id.
    pub id: TrialId,
    /// The study this trial belongs to.
    pub study_id: StudyId,
    /// Zero-based, per-study sequence number.
    pub number: u64,
    /// Lifecycle state.
    pub state: TrialState,
    /// Final value; present only for `Complete` and `Pruned` trials.
    pub value: Option<f64>,
    /// Suggested parameters keyed by name.
    pub params: HashMap<String, TrialParam>,
    /// Intermediate values keyed by step.
    pub intermediate_values: BTreeMap<u64, f64>,
    /// User-defined attributes.
    pub user_attrs: BTreeMap<String, String>,
    /// Attributes written by the library (e.g. [`FAIL_REASON_ATTR`]).
    pub system_attrs: BTreeMap<String, String>,
    /// When the trial was created.
    pub datetime_start: DateTime<Utc>,
    /// When the trial reached a terminal state.
    pub datetime_complete: Option<DateTime<Utc>>,
}

impl FrozenTrial {
    /// A fresh `Running` trial with no parameters.
    #[must_use]
    pub fn new_running(id: TrialId, study_id: StudyId, number: u64) -> Self {
        Self {
            id,
            study_id,
            number,
            state: TrialState::Running,
            value: None,
            params: HashMap::new(),
            intermediate_values: BTreeMap::new(),
            user_attrs: BTreeMap::new(),
            system_attrs: BTreeMap::new(),
            datetime_start: Utc::now(),
            datetime_complete: None,
        }
    }

    /// The external value of parameter `name`, if it was suggested.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).map(TrialParam::external)
    }

    /// All parameters as external values.
    #[must_use]
    pub fn external_params(&self) -> HashMap<String, ParamValue> {
        self.params
            .iter()
            .map(|(name, p)| (name.clone(), p.external()))
            .collect()
    }

    /// The highest step an intermediate value was reported for.
    #[must_use]
    pub fn last_step(&self) -> Option<u64> {
        self.intermediate_values.keys().next_back().copied()
    }

    /// The intermediate value reported at the highest step.
    #[must_use]
    pub fn last_intermediate_value(&self) -> Option<f64> {
        self.intermediate_values.values().next_back().copied()
    }

    /// The recorded failure reason, if the trial failed.
    #[must_use]
    pub fn fail_reason(&self) -> Option<&str> {
        self.system_attrs.get(FAIL_REASON_ATTR).map(String::as_str)
    }
}

/// Aggregate information about a study.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    /// Storage-assigned study id.
    pub study_id: StudyId,
    /// Unique study name.
    pub name: String,
    /// Optimization direction.
    pub direction: Direction,
    /// The best complete trial, if any.
    pub best_trial: Option<FrozenTrial>,
    /// Number of trials in any state.
    pub n_trials: usize,
    /// Start time of the first trial.
    pub datetime_start: Option<DateTime<Utc>>,
    /// Study-level user attributes.
    pub user_attrs: BTreeMap<String, String>,
}

/// Picks the best `Complete` trial under `direction`.
///
/// Ties go to the lowest trial number.
pub(crate) fn best_of<'a>(
    trials: impl IntoIterator<Item = &'a FrozenTrial>,
    direction: Direction,
) -> Option<&'a FrozenTrial> {
    let mut best: Option<(&FrozenTrial, f64)> = None;
    for trial in trials {
        let (TrialState::Complete, Some(value)) = (trial.state, trial.value) else {
            continue;
        };
        best = match best {
            None => Some((trial, value)),
            Some((incumbent, best_value)) => {
                if outranks(direction, (trial.number, value), (incumbent.number, best_value)) {
                    Some((trial, value))
                } else {
                    Some((incumbent, best_value))
                }
            }
        };
    }
    best.map(|(t, _)| t)
}

/// Returns `true` if `(number, value)` beats the incumbent: a strictly
/// better value, or an equal value from an earlier trial.
pub(crate) fn outranks(direction: Direction, candidate: (u64, f64), incumbent: (u64, f64)) -> bool {
    match direction.rank(candidate.1, incumbent.1) {
        core::cmp::Ordering::Less => true,
        core::cmp::Ordering::Equal => candidate.0 < incumbent.0,
        core::cmp::Ordering::Greater => false,
    }
}
