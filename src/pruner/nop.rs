use super::Pruner;
use crate::frozen::FrozenTrial;
use crate::types::Direction;

/// A pruner that never prunes. This is the default when no pruner is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopPruner;

impl Pruner for NopPruner {
    fn should_prune(
        &self,
        _direction: Direction,
        _trial: &FrozenTrial,
        _history: &[FrozenTrial],
    ) -> bool {
        false
    }
}
