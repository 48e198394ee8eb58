use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use super::{Storage, check_existing_param, check_study_distribution, summarize};
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary, TrialParam};
use crate::types::{Direction, StudyId, TrialId, TrialState};

struct StudyRecord {
    name: String,
    direction: Direction,
    user_attrs: BTreeMap<String, String>,
    trial_ids: Vec<TrialId>,
    param_distributions: Arc<Mutex<HashMap<String, Distribution>>>,
}

type TrialSlot = Option<Arc<Mutex<FrozenTrial>>>;

/// In-memory storage (the default).
///
/// Trials live in an arena indexed by [`TrialId`]; each slot has its own
/// mutex so that workers touching different trials never contend.  The
/// study table is guarded separately and is always locked before the arena.
/// Each study keeps its own parameter registry, locked before any of its
/// trials, so parameter writes in different studies do not contend.
pub struct MemoryStorage {
    studies: RwLock<BTreeMap<StudyId, StudyRecord>>,
    trials: RwLock<Vec<TrialSlot>>,
    next_study_id: AtomicU64,
}

impl MemoryStorage {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            studies: RwLock::new(BTreeMap::new()),
            trials: RwLock::new(Vec::new()),
            next_study_id: AtomicU64::new(0),
        }
    }

    fn slot(&self, trial_id: TrialId) -> Result<Arc<Mutex<FrozenTrial>>> {
        usize::try_from(trial_id)
            .ok()
            .and_then(|idx| self.trials.read().get(idx).cloned().flatten())
            .ok_or(Error::TrialNotFound(trial_id))
    }

    /// Runs `f` on a trial that must still be running.
    fn update_running<T>(
        &self,
        trial_id: TrialId,
        f: impl FnOnce(&mut FrozenTrial) -> Result<T>,
    ) -> Result<T> {
        let slot = self.slot(trial_id)?;
        let mut trial = slot.lock();
        if trial.state.is_finished() {
            return Err(Error::TrialAlreadyFinished {
                number: trial.number,
                state: trial.state,
            });
        }
        f(&mut trial)
    }

    fn with_study<T>(&self, study_id: StudyId, f: impl FnOnce(&StudyRecord) -> T) -> Result<T> {
        self.studies
            .read()
            .get(&study_id)
            .map(f)
            .ok_or_else(|| Error::StudyNotFound(study_id.to_string()))
    }

    fn snapshot(&self, ids: &[TrialId]) -> Vec<FrozenTrial> {
        let slots: Vec<_> = {
            let arena = self.trials.read();
            ids.iter()
                .filter_map(|&id| usize::try_from(id).ok())
                .filter_map(|idx| arena.get(idx).cloned().flatten())
                .collect()
        };
        slots.iter().map(|slot| slot.lock().clone()).collect()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn create_new_study(&self, name: &str, direction: Direction) -> Result<StudyId> {
        let mut studies = self.studies.write();
        if studies.values().any(|s| s.name == name) {
            return Err(Error::StudyAlreadyExists(name.to_owned()));
        }
        let id = self.next_study_id.fetch_add(1, Ordering::SeqCst);
        studies.insert(
            id,
            StudyRecord {
                name: name.to_owned(),
                direction,
                user_attrs: BTreeMap::new(),
                trial_ids: Vec::new(),
                param_distributions: Arc::new(Mutex::new(HashMap::new())),
            },
        );
        Ok(id)
    }

    fn get_study_id_from_name(&self, name: &str) -> Result<StudyId> {
        self.studies
            .read()
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(&id, _)| id)
            .ok_or_else(|| Error::StudyNotFound(name.to_owned()))
    }

    fn get_study_name(&self, study_id: StudyId) -> Result<String> {
        self.with_study(study_id, |s| s.name.clone())
    }

    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction> {
        self.with_study(study_id, |s| s.direction)
    }

    fn delete_study(&self, study_id: StudyId) -> Result<()> {
        let mut studies = self.studies.write();
        let record = studies
            .remove(&study_id)
            .ok_or_else(|| Error::StudyNotFound(study_id.to_string()))?;
        let mut arena = self.trials.write();
        for id in record.trial_ids {
            if let Some(slot) = usize::try_from(id).ok().and_then(|idx| arena.get_mut(idx)) {
                *slot = None;
            }
        }
        Ok(())
    }

    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>> {
        let studies: Vec<_> = self
            .studies
            .read()
            .iter()
            .map(|(&id, s)| {
                (
                    id,
                    s.name.clone(),
                    s.direction,
                    s.user_attrs.clone(),
                    s.trial_ids.clone(),
                )
            })
            .collect();
        Ok(studies
            .into_iter()
            .map(|(id, name, direction, attrs, ids)| {
                summarize(id, name, direction, attrs, &self.snapshot(&ids))
            })
            .collect())
    }

    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: &str) -> Result<()> {
        self.studies
            .write()
            .get_mut(&study_id)
            .map(|s| {
                s.user_attrs.insert(key.to_owned(), value.to_owned());
            })
            .ok_or_else(|| Error::StudyNotFound(study_id.to_string()))
    }

    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<BTreeMap<String, String>> {
        self.with_study(study_id, |s| s.user_attrs.clone())
    }

    fn create_new_trial(&self, study_id: StudyId) -> Result<TrialId> {
        let mut studies = self.studies.write();
        let record = studies
            .get_mut(&study_id)
            .ok_or_else(|| Error::StudyNotFound(study_id.to_string()))?;
        let number = record.trial_ids.len() as u64;

        let mut arena = self.trials.write();
        let id = arena.len() as TrialId;
        arena.push(Some(Arc::new(Mutex::new(FrozenTrial::new_running(
            id, study_id, number,
        )))));
        record.trial_ids.push(id);
        Ok(id)
    }

    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<()> {
        let slot = self.slot(trial_id)?;
        let study_id = slot.lock().study_id;
        let registry = self.with_study(study_id, |s| Arc::clone(&s.param_distributions))?;

        // Lock order: study registry, then trial.
        let mut known = registry.lock();
        let mut trial = slot.lock();
        if trial.state.is_finished() {
            return Err(Error::TrialAlreadyFinished {
                number: trial.number,
                state: trial.state,
            });
        }
        if check_existing_param(name, trial.params.get(name), internal, distribution)? {
            return Ok(());
        }
        check_study_distribution(name, known.get(name), distribution)?;

        trial.params.insert(
            name.to_owned(),
            TrialParam {
                value: internal,
                distribution: distribution.clone(),
            },
        );
        known
            .entry(name.to_owned())
            .or_insert_with(|| distribution.clone());
        Ok(())
    }

    fn set_trial_intermediate_value(
        &self,
        trial_id: TrialId,
        step: u64,
        value: f64,
    ) -> Result<()> {
        self.update_running(trial_id, |trial| {
            trial.intermediate_values.insert(step, value);
            Ok(())
        })
    }

    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()> {
        self.update_running(trial_id, |trial| {
            trial.value = Some(value);
            Ok(())
        })
    }

    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()> {
        self.update_running(trial_id, |trial| {
            trial.state = state;
            if state.is_finished() {
                trial.datetime_complete = Some(Utc::now());
            }
            Ok(())
        })
    }

    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()> {
        self.update_running(trial_id, |trial| {
            trial.user_attrs.insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }

    fn set_trial_system_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()> {
        self.update_running(trial_id, |trial| {
            trial.system_attrs.insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }

    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial> {
        Ok(self.slot(trial_id)?.lock().clone())
    }

    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        let ids = self.with_study(study_id, |s| s.trial_ids.clone())?;
        Ok(self.snapshot(&ids))
    }

    fn get_trial_param(&self, trial_id: TrialId, name: &str) -> Result<Option<TrialParam>> {
        Ok(self.slot(trial_id)?.lock().params.get(name).cloned())
    }
}
