//! Run options and progress callbacks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use usync_core::services::PlannedItems;

/// Progress of one handler within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerState {
    /// Not started.
    Pending,
    /// Running.
    Processing,
    /// Finished.
    Complete,
}

type UpdateFn = dyn Fn(&str, usize, usize) + Send + Sync;
type StatusFn = dyn Fn(&str, HandlerState) + Send + Sync;

/// Progress callbacks invoked by the pipeline.
///
/// Both callbacks are fire and forget: the pipeline does not wait on, or
/// look at, anything they do.
#[derive(Default)]
pub struct SyncCallbacks {
    update: Option<Box<UpdateFn>>,
    status: Option<Box<StatusFn>>,
}

impl std::fmt::Debug for SyncCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCallbacks")
            .field("update", &self.update.is_some())
            .field("status", &self.status.is_some())
            .finish()
    }
}

impl SyncCallbacks {
    /// No callbacks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the per item progress callback: `(message, count, total)`.
    pub fn with_update(mut self, update: impl Fn(&str, usize, usize) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(update));
        self
    }

    /// Sets the per handler status callback.
    pub fn with_status(mut self, status: impl Fn(&str, HandlerState) + Send + Sync + 'static) -> Self {
        self.status = Some(Box::new(status));
        self
    }

    /// Reports progress.
    pub fn update(&self, message: &str, count: usize, total: usize) {
        if let Some(update) = &self.update {
            update(message, count, total);
        }
    }

    /// Reports a handler state change.
    pub fn status(&self, handler: &str, state: HandlerState) {
        if let Some(status) = &self.status {
            status(handler, state);
        }
    }
}

/// Options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    /// Handler set; empty for the default set.
    pub set: String,
    /// Only run handlers in this group.
    pub group: Option<String>,
    /// Import items even when unchanged.
    pub force: bool,
    /// Remove orphans on export and process clean markers on import.
    pub clean: bool,
    /// Client the run reports progress to.
    pub client_id: Option<String>,
    /// Items a report treats as already imported.
    #[serde(skip)]
    pub planned: Option<Arc<PlannedItems>>,
}

impl SyncOptions {
    /// Options for the default set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a handler set.
    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = set.into();
        self
    }

    /// Limits the run to one group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Forces imports.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Enables cleaning.
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Resolves report references against `planned`.
    pub fn with_planned(mut self, planned: Arc<PlannedItems>) -> Self {
        self.planned = Some(planned);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn callbacks_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callbacks = SyncCallbacks::none().with_update(move |_, n, _| {
            seen.fetch_add(n, Ordering::SeqCst);
        });
        callbacks.update("a", 1, 3);
        callbacks.update("b", 2, 3);
        callbacks.status("dataTypeHandler", HandlerState::Complete);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
