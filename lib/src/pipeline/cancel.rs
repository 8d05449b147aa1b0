//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const UNARMED: usize = usize::MAX;

/// Shared cancellation flag checked at the top of every layer iteration.
///
/// Clones share state, so a token can be handed to another thread and
/// cancelled from there while a session is running.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    /// Checkpoints left before cancelling itself, or `UNARMED`.
    remaining: Arc<AtomicUsize>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            remaining: Arc::new(AtomicUsize::new(UNARMED)),
        }
    }

    /// A token that lets `n` checkpoints pass and cancels on the next one.
    pub fn after_checkpoints(n: usize) -> Self {
        let token = Self::new();
        token.remaining.store(n.min(UNARMED - 1), Ordering::SeqCst);
        token
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Pass a checkpoint. Returns true if work must stop here.
    pub(crate) fn checkpoint(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let step = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| match r {
                UNARMED | 0 => None,
                r => Some(r - 1),
            });
        if step == Err(0) {
            self.cancel();
            return true;
        }
        false
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_token() {
        let token = CancellationToken::new();
        for _ in 0..100 {
            assert!(!token.checkpoint());
        }
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        assert!(token.checkpoint());
    }

    #[test]
    fn test_after_checkpoints() {
        let token = CancellationToken::after_checkpoints(3);
        assert!(!token.checkpoint());
        assert!(!token.checkpoint());
        assert!(!token.checkpoint());
        assert!(!token.is_cancelled());
        assert!(token.checkpoint());
        assert!(token.is_cancelled());
        assert!(token.checkpoint());

        assert!(CancellationToken::after_checkpoints(0).checkpoint());
    }
}
