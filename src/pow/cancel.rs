//! Cancellation token shared between a caller and the solver workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot broadcast cancellation signal.
///
/// Cloning shares the same flag. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check whether the signal has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Guard that raises this token when dropped, unless disarmed first.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: Some(self.clone()),
        }
    }
}

/// Raises a [`CancelToken`] when dropped.
///
/// Held across an `.await` on a blocking search so that dropping the
/// enclosing future still stops the workers.
#[derive(Debug)]
#[must_use = "the token is raised as soon as the guard is dropped"]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// Drop the guard without raising the token.
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}
