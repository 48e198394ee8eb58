//! Cooperative cancellation shared between a study and its trials.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag that, once raised, stays raised.
///
/// A [`Study`](crate::Study) stops creating trials as soon as its token is
/// cancelled. Running objectives see the same token through
/// [`Trial::cancellation`](crate::Trial::cancellation) and are expected to
/// poll it and return early; nothing is forcibly interrupted.
///
/// # Examples
///
/// ```
/// use hyperstudy::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not yet cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag for every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
