//! Stepwise runs: one handler per request.
//!
//! A client sends the same request id with an increasing step number. Each
//! step runs the handler at that index and caches its actions. The step
//! after the last handler finishes the run (second pass, post import and
//! clean for imports), returns every cached action and drops the cache
//! entry. A request id with no open entry is rejected, so a repeated final
//! step never finishes a run twice.

use crate::action::SyncAction;
use crate::callbacks::{HandlerState, SyncCallbacks, SyncOptions};
use crate::error::{BackOfficeError, BackOfficeResult};
use crate::handlers::ConfiguredHandler;
use crate::service::SyncService;
use crate::settings::HandlerAction;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Actions collected so far, keyed by request id.
#[derive(Debug, Default)]
pub struct ActionCache {
    entries: RwLock<HashMap<Uuid, Vec<SyncAction>>>,
}

impl ActionCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds actions to a request's entry.
    pub fn append(&self, id: Uuid, actions: Vec<SyncAction>) {
        self.entries.write().entry(id).or_default().extend(actions);
    }

    /// A copy of a request's actions.
    pub fn get(&self, id: Uuid) -> Vec<SyncAction> {
        self.entries.read().get(&id).cloned().unwrap_or_default()
    }

    /// Removes and returns a request's actions; `None` for an unknown or
    /// already finished request.
    pub fn take(&self, id: Uuid) -> Option<Vec<SyncAction>> {
        self.entries.write().remove(&id)
    }

    /// Whether a request has an open entry.
    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Number of open requests.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no request is open.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// What a stepwise request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    /// Import.
    Import,
    /// Report.
    Report,
    /// Export.
    Export,
}

impl StepAction {
    fn handler_action(self) -> HandlerAction {
        match self {
            StepAction::Import => HandlerAction::Import,
            StepAction::Report => HandlerAction::Report,
            StepAction::Export => HandlerAction::Export,
        }
    }
}

/// One step request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Id from the first response; `None` starts a new run.
    pub request_id: Option<Uuid>,
    /// What to run.
    pub action: StepAction,
    /// Index of the handler to run.
    pub step_number: usize,
    /// Run options.
    #[serde(default)]
    pub options: SyncOptions,
    /// Sync folder; the configured root when `None`.
    #[serde(default)]
    pub folder: Option<PathBuf>,
}

impl ActionRequest {
    /// The first step of a new run.
    pub fn start(action: StepAction, options: SyncOptions) -> Self {
        Self {
            request_id: None,
            action,
            step_number: 0,
            options,
            folder: None,
        }
    }

    /// Uses a specific folder.
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// The request for the step after `response`.
    pub fn next(&self, response: &ActionResponse) -> Self {
        Self {
            request_id: Some(response.request_id),
            step_number: self.step_number + 1,
            ..self.clone()
        }
    }
}

/// Progress of one handler in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerStatus {
    /// Handler name.
    pub name: String,
    /// Handler icon.
    pub icon: String,
    /// Where the handler is.
    pub status: HandlerState,
}

/// One step's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    /// Id to send with the next step.
    pub request_id: Uuid,
    /// Every handler in the run.
    pub status: Vec<HandlerStatus>,
    /// This step's actions; every action of the run once complete.
    pub actions: Vec<SyncAction>,
    /// Whether the run has finished.
    pub complete: bool,
}

/// Drives runs a step at a time.
#[derive(Debug)]
pub struct SyncActionService {
    sync: Arc<SyncService>,
    cache: ActionCache,
}

impl SyncActionService {
    /// Creates a service.
    pub fn new(sync: Arc<SyncService>) -> Self {
        Self {
            sync,
            cache: ActionCache::new(),
        }
    }

    /// The cache of open runs.
    pub fn cache(&self) -> &ActionCache {
        &self.cache
    }

    /// Runs one step.
    pub fn perform(&self, request: &ActionRequest) -> BackOfficeResult<ActionResponse> {
        self.perform_with(request, &SyncCallbacks::none())
    }

    /// Runs one step, reporting progress through `callbacks`.
    pub fn perform_with(&self, request: &ActionRequest, callbacks: &SyncCallbacks) -> BackOfficeResult<ActionResponse> {
        let folder = request.folder.clone().unwrap_or_else(|| self.sync.settings().root());
        let handlers = self
            .sync
            .handlers_for(&request.options, request.action.handler_action())?;
        let id = match request.request_id {
            Some(id) if !self.cache.contains(id) => {
                warn!(request = %id, step = request.step_number, "step for an unknown run");
                return Err(BackOfficeError::RequestNotFound(id));
            }
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                self.cache.append(id, Vec::new());
                id
            }
        };

        if let Some(configured) = handlers.get(request.step_number) {
            debug!(request = %id, step = request.step_number, handler = configured.handler.alias(), "step");
            let mut actions = Vec::new();
            if request.step_number == 0 && request.action != StepAction::Export {
                actions.extend(self.sync.version_check(&folder));
            }
            actions.extend(self.run_step(request, configured, &folder, callbacks));
            self.cache.append(id, actions.clone());
            return Ok(ActionResponse {
                request_id: id,
                status: statuses(&handlers, request.step_number),
                actions,
                complete: false,
            });
        }

        let Some(mut actions) = self.cache.take(id) else {
            return Err(BackOfficeError::RequestNotFound(id));
        };
        match request.action {
            StepAction::Import => actions = self.sync.import_finish(&folder, actions, &request.options)?,
            StepAction::Export => self.sync.finish_export(&folder)?,
            StepAction::Report => {}
        }
        info!(request = %id, actions = actions.len(), "stepwise run complete");
        Ok(ActionResponse {
            request_id: id,
            status: statuses(&handlers, handlers.len()),
            actions,
            complete: true,
        })
    }

    fn run_step(
        &self,
        request: &ActionRequest,
        configured: &ConfiguredHandler,
        folder: &std::path::Path,
        callbacks: &SyncCallbacks,
    ) -> Vec<SyncAction> {
        match request.action {
            StepAction::Import => self.sync.import_handler(configured, folder, &request.options, callbacks),
            StepAction::Report => self.sync.report_handler(configured, folder, &request.options, callbacks),
            StepAction::Export => self.sync.export_handler(configured, folder, &request.options, callbacks),
        }
    }
}

/// Handlers up to `step` are complete and the one after it runs next.
fn statuses(handlers: &[ConfiguredHandler], step: usize) -> Vec<HandlerStatus> {
    handlers
        .iter()
        .enumerate()
        .map(|(index, configured)| HandlerStatus {
            name: configured.handler.name().to_string(),
            icon: configured.handler.icon().to_string(),
            status: match index {
                i if i <= step => HandlerState::Complete,
                i if i == step + 1 => HandlerState::Processing,
                _ => HandlerState::Pending,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::default_handlers;
    use crate::settings::SyncSettings;
    use usync_core::services::SyncServices;
    use usync_core::ChangeType;

    fn service() -> SyncActionService {
        let sync = SyncService::new(SyncSettings::default(), default_handlers(&SyncServices::in_memory()));
        SyncActionService::new(Arc::new(sync))
    }

    #[test]
    fn cache_append_and_take() {
        let cache = ActionCache::new();
        let id = Uuid::new_v4();
        let action = SyncAction::succeed("h", "DataType", "a", ChangeType::NoChange);
        cache.append(id, vec![action.clone()]);
        cache.append(id, vec![action]);
        assert_eq!(cache.get(id).len(), 2);
        assert_eq!(cache.take(id).map(|a| a.len()), Some(2));
        assert!(cache.is_empty());
        assert!(cache.take(id).is_none());
    }

    #[test]
    fn steps_until_complete_then_clears() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let mut request = ActionRequest::start(StepAction::Report, SyncOptions::default()).with_folder(dir.path());

        let first = svc.perform(&request).unwrap();
        assert!(!first.complete);
        assert_eq!(first.status[0].status, HandlerState::Complete);
        assert_eq!(first.status[1].status, HandlerState::Processing);
        assert!(first.status[2..].iter().all(|s| s.status == HandlerState::Pending));
        assert_eq!(svc.cache().len(), 1);

        let total = first.status.len();
        let mut response = first;
        for _ in 0..total {
            request = request.next(&response);
            response = svc.perform(&request).unwrap();
        }
        assert!(response.complete);
        assert!(response.status.iter().all(|s| s.status == HandlerState::Complete));
        assert!(svc.cache().is_empty());
    }

    #[test]
    fn unknown_request_id_is_rejected() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let request = ActionRequest {
            request_id: Some(Uuid::new_v4()),
            ..ActionRequest::start(StepAction::Report, SyncOptions::default()).with_folder(dir.path())
        };
        assert!(matches!(svc.perform(&request), Err(BackOfficeError::RequestNotFound(_))));
        assert!(svc.cache().is_empty());
    }

    #[test]
    fn distinct_runs_do_not_share_entries() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let a = svc
            .perform(&ActionRequest::start(StepAction::Export, SyncOptions::default()).with_folder(dir.path()))
            .unwrap();
        let b = svc
            .perform(&ActionRequest::start(StepAction::Export, SyncOptions::default()).with_folder(dir.path()))
            .unwrap();
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(svc.cache().len(), 2);
    }

    #[test]
    fn request_json_shape() {
        let request: ActionRequest = serde_json::from_str(
            r#"{"requestId":null,"action":"Import","stepNumber":2,"options":{"set":"Default","force":true}}"#,
        )
        .unwrap();
        assert_eq!(request.step_number, 2);
        assert!(request.options.force);
        assert!(request.folder.is_none());
    }
}
