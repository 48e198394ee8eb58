//! Core types shared by studies, trials and storage backends.

use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a study.
pub type StudyId = u64;

/// Storage-assigned identifier of a trial, unique across all studies of a backend.
pub type TrialId = u64;

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// Returns `true` if `candidate` is strictly better than `incumbent`.
    ///
    /// Equal values are never an improvement, so the earlier trial wins ties.
    #[must_use]
    pub fn is_improvement(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }

    /// Orders two objective values so that the better one compares as `Less`.
    #[must_use]
    pub fn rank(self, a: f64, b: f64) -> core::cmp::Ordering {
        let ordering = a.total_cmp(&b);
        match self {
            Direction::Minimize => ordering,
            Direction::Maximize => ordering.reverse(),
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Direction::Minimize => "minimize",
            Direction::Maximize => "maximize",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "minimize" => Some(Direction::Minimize),
            "maximize" => Some(Direction::Maximize),
            _ => None,
        }
    }
}

/// The state of a trial in its lifecycle.
///
/// `Running` is the only non-terminal state; once a trial leaves it, the
/// trial is immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    /// The trial is currently running.
    Running,
    /// The trial completed successfully.
    Complete,
    /// The trial was stopped early by a pruner or by cancellation.
    Pruned,
    /// The trial failed with an error.
    Failed,
}

impl TrialState {
    /// Returns `true` for `Complete`, `Pruned` and `Failed`.
    #[must_use]
    pub fn is_finished(self) -> bool {
        !matches!(self, TrialState::Running)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TrialState::Running => "running",
            TrialState::Complete => "complete",
            TrialState::Pruned => "pruned",
            TrialState::Failed => "failed",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(TrialState::Running),
            "complete" => Some(TrialState::Complete),
            "pruned" => Some(TrialState::Pruned),
            "failed" => Some(TrialState::Failed),
            _ => None,
        }
    }
}
