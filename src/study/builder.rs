use std::sync::Arc;

use chrono::Utc;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::pruner::{NopPruner, Pruner};
use crate::sampler::Sampler;
use crate::sampler::random::RandomSampler;
use crate::storage::{MemoryStorage, Storage};
use crate::types::{Direction, StudyId};

use super::Study;

/// A builder for constructing [`Study`] instances with a fluent API.
///
/// Created via [`Study::builder()`].
///
/// # Defaults
///
/// - Name: generated, unique per call
/// - Direction: [`Minimize`](Direction::Minimize)
/// - Sampler: [`RandomSampler`]
/// - Pruner: [`NopPruner`]
/// - Storage: a fresh [`MemoryStorage`]
/// - Cancellation: a fresh [`CancellationToken`]
///
/// # Create or attach
///
/// [`build`](Self::build) attaches to an existing study when the storage
/// already holds one with the given name; the stored direction then wins
/// over the configured one. [`load`](Self::load) only attaches.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use hyperstudy::prelude::*;
///
/// let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
/// let first = Study::builder()
///     .name("resnet")
///     .maximize()
///     .storage(Arc::clone(&storage))
///     .build()
///     .unwrap();
///
/// // Attaching adopts the stored direction.
/// let second = Study::builder()
///     .name("resnet")
///     .minimize()
///     .storage(storage)
///     .pruner(MedianPruner::new().n_warmup_steps(5))
///     .build()
///     .unwrap();
/// assert_eq!(second.direction(), Direction::Maximize);
/// assert_eq!(first.study_id(), second.study_id());
/// ```
#[must_use]
pub struct StudyBuilder {
    name: Option<String>,
    direction: Direction,
    sampler: Option<Arc<dyn Sampler>>,
    pruner: Option<Arc<dyn Pruner>>,
    storage: Option<Arc<dyn Storage>>,
    cancel: Option<CancellationToken>,
}

impl StudyBuilder {
    pub(super) fn new() -> Self {
        Self {
            name: None,
            direction: Direction::Minimize,
            sampler: None,
            pruner: None,
            storage: None,
            cancel: None,
        }
    }

    /// Set the study name used to create or attach.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the optimization direction to minimize (the default).
    pub fn minimize(mut self) -> Self {
        self.direction = Direction::Minimize;
        self
    }

    /// Set the optimization direction to maximize.
    pub fn maximize(mut self) -> Self {
        self.direction = Direction::Maximize;
        self
    }

    /// Set the optimization direction explicitly.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the sampler used for parameter suggestions.
    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Some(Arc::new(sampler));
        self
    }

    /// Set the pruner consulted by [`Trial::should_prune`](crate::Trial::should_prune).
    pub fn pruner(mut self, pruner: impl Pruner + 'static) -> Self {
        self.pruner = Some(Arc::new(pruner));
        self
    }

    /// Set the storage backend. Pass the same `Arc` to several studies (or
    /// open the same database file in several processes) to share trials.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use an existing cancellation token, e.g. one already wired to a
    /// signal handler.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Creates the study, or attaches to it if the name is already taken.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn build(self) -> Result<Study> {
        let storage = self.storage_or_default();
        let name = self.name.clone().unwrap_or_else(generate_name);

        let (study_id, direction) = match storage.get_study_id_from_name(&name) {
            Ok(id) => attach(&*storage, &name, id)?,
            Err(Error::StudyNotFound(_)) => {
                match storage.create_new_study(&name, self.direction) {
                    Ok(id) => {
                        trace_info!(study = %name, direction = ?self.direction, "study created");
                        (id, self.direction)
                    }
                    // Lost a race with another process creating the same name.
                    Err(Error::StudyAlreadyExists(_)) => {
                        let id = storage.get_study_id_from_name(&name)?;
                        attach(&*storage, &name, id)?
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        self.finish(storage, study_id, name, direction)
    }

    /// Attaches to an existing study; never creates one.
    ///
    /// # Errors
    ///
    /// [`Error::StudyNotFound`] if no name was set or the storage has no
    /// study with that name.
    pub fn load(self) -> Result<Study> {
        let storage = self.storage_or_default();
        let name = self
            .name
            .clone()
            .ok_or_else(|| Error::StudyNotFound("<unnamed>".to_owned()))?;
        let id = storage.get_study_id_from_name(&name)?;
        let (study_id, direction) = attach(&*storage, &name, id)?;
        self.finish(storage, study_id, name, direction)
    }

    fn storage_or_default(&self) -> Arc<dyn Storage> {
        self.storage
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()))
    }

    fn finish(
        self,
        storage: Arc<dyn Storage>,
        study_id: StudyId,
        name: String,
        direction: Direction,
    ) -> Result<Study> {
        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(RandomSampler::new()));
        let pruner = self.pruner.unwrap_or_else(|| Arc::new(NopPruner));
        let cancel = self.cancel.unwrap_or_default();
        Study::assemble(study_id, name, direction, sampler, pruner, storage, cancel)
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn attach(storage: &dyn Storage, name: &str, study_id: StudyId) -> Result<(StudyId, Direction)> {
    let direction = storage.get_study_direction(study_id)?;
    trace_info!(study = %name, ?direction, "attached to existing study");
    Ok((study_id, direction))
}

fn generate_name() -> String {
    format!(
        "study-{}-{:08x}",
        Utc::now().format("%Y%m%d-%H%M%S"),
        fastrand::u32(..)
    )
}
