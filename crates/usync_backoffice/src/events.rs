//! Suppression of host save notifications during imports.
//!
//! Saving an item in the host normally exports it. While an import runs the
//! pipeline itself saves items, and those saves must not be written straight
//! back to disk. [`SyncEventSuppressor::pause`] returns a guard; notifications
//! are suppressed while any guard is alive, including when the import returns
//! early with an error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared pause counter.
#[derive(Debug, Clone, Default)]
pub struct SyncEventSuppressor {
    depth: Arc<AtomicUsize>,
}

impl SyncEventSuppressor {
    /// Creates a suppressor with no active pauses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses notifications until the guard is dropped.
    pub fn pause(&self) -> SuppressionGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        SuppressionGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    /// Returns true while at least one guard is alive.
    pub fn is_paused(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

/// Keeps notifications paused for its lifetime.
#[derive(Debug)]
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct SuppressionGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest() {
        let suppressor = SyncEventSuppressor::new();
        assert!(!suppressor.is_paused());
        {
            let _outer = suppressor.pause();
            {
                let _inner = suppressor.clone().pause();
                assert!(suppressor.is_paused());
            }
            assert!(suppressor.is_paused());
        }
        assert!(!suppressor.is_paused());
    }

    #[test]
    fn released_on_early_return() {
        fn failing(suppressor: &SyncEventSuppressor) -> Result<(), &'static str> {
            let _guard = suppressor.pause();
            Err("import failed")
        }

        let suppressor = SyncEventSuppressor::new();
        assert!(failing(&suppressor).is_err());
        assert!(!suppressor.is_paused());
    }

    #[test]
    fn released_on_panic() {
        let suppressor = SyncEventSuppressor::new();
        let inner = suppressor.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.pause();
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert!(!suppressor.is_paused());
    }
}
