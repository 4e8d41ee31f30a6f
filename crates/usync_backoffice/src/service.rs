//! The sync pipeline.
//!
//! A run moves through [`SyncPhase`]s: handlers run one by one in priority
//! order for the requested action; an import then runs the second pass for
//! items that asked for one, the post import step and finally clean. A
//! failing handler is reported as a failed action and the run carries on
//! with the next handler.

use crate::action::{replace_actions, summarise_actions, SyncAction};
use crate::callbacks::{HandlerState, SyncCallbacks, SyncOptions};
use crate::error::{BackOfficeError, BackOfficeResult};
use crate::events::SyncEventSuppressor;
use crate::handlers::{ConfiguredHandler, HandlerFactory, SyncHandler};
use crate::settings::{HandlerAction, SyncSettings};
use crate::store::SyncFileStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use usync_core::dependency::{DependencyFlags, SyncDependency};
use usync_core::services::PlannedItems;
use usync_core::ChangeType;
use usync_xml::{FormatCheck, XElement, FORMAT_VERSION, VERSION_FILE};
use uuid::Uuid;

/// Folder import history is written to, under the sync root.
pub const HISTORY_FOLDER: &str = "history";

const PIPELINE: &str = "uSync";

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing running.
    Idle,
    /// Handlers exporting.
    Export,
    /// Handlers reporting.
    Report,
    /// Handlers importing (first pass).
    Import,
    /// Re-importing items with deferred references.
    SecondPass,
    /// Retrying items placed at the root.
    PostImport,
    /// Processing clean markers.
    Clean,
    /// Finished.
    Complete,
}

impl SyncPhase {
    /// Returns true while a run is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, SyncPhase::Idle | SyncPhase::Complete)
    }
}

/// Runs handlers against a sync folder.
pub struct SyncService {
    settings: SyncSettings,
    handlers: HandlerFactory,
    store: SyncFileStore,
    suppressor: SyncEventSuppressor,
    phase: RwLock<SyncPhase>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("handlers", &self.handlers)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SyncService {
    /// Creates a service.
    pub fn new(settings: SyncSettings, handlers: HandlerFactory) -> Self {
        let store = SyncFileStore::new(settings.default_extension.clone());
        Self {
            settings,
            handlers,
            store,
            suppressor: SyncEventSuppressor::new(),
            phase: RwLock::new(SyncPhase::Idle),
        }
    }

    /// Shares an existing suppressor, e.g. with the host's notification hooks.
    pub fn with_suppressor(mut self, suppressor: SyncEventSuppressor) -> Self {
        self.suppressor = suppressor;
        self
    }

    /// The settings.
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The handler registry.
    pub fn handlers(&self) -> &HandlerFactory {
        &self.handlers
    }

    /// The suppressor paused during imports.
    pub fn suppressor(&self) -> &SyncEventSuppressor {
        &self.suppressor
    }

    /// The current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: SyncPhase) {
        debug!(?phase, "sync phase");
        *self.phase.write() = phase;
    }

    /// Handlers that run for `action`, with their effective settings.
    pub fn handlers_for(&self, options: &SyncOptions, action: HandlerAction) -> BackOfficeResult<Vec<ConfiguredHandler>> {
        let set = self.settings.handler_set(&options.set)?;
        let mut handlers = self.handlers.handlers_for(set, options.group.as_deref(), action);
        if self.settings.fail_on_missing_parent {
            for configured in &mut handlers {
                configured.settings.fail_on_missing_parent = true;
            }
        }
        Ok(handlers)
    }

    fn configured(&self, item_type: &str, options: &SyncOptions, action: HandlerAction) -> BackOfficeResult<Option<ConfiguredHandler>> {
        Ok(self
            .handlers_for(options, action)?
            .into_iter()
            .find(|c| c.handler.item_type() == item_type))
    }

    fn handler_failed(handler: &dyn SyncHandler, error: &BackOfficeError) -> SyncAction {
        warn!(handler = handler.alias(), error = %error, "handler failed");
        SyncAction::from_error(handler.alias(), handler.item_type(), handler.name(), error)
    }

    fn run_handler(
        &self,
        configured: &ConfiguredHandler,
        callbacks: &SyncCallbacks,
        run: impl FnOnce() -> BackOfficeResult<Vec<SyncAction>>,
    ) -> Vec<SyncAction> {
        let handler = configured.handler.as_ref();
        callbacks.status(handler.name(), HandlerState::Processing);
        let actions = run().unwrap_or_else(|err| vec![Self::handler_failed(handler, &err)]);
        callbacks.status(handler.name(), HandlerState::Complete);
        actions
    }

    /// Exports one handler's items.
    pub fn export_handler(
        &self,
        configured: &ConfiguredHandler,
        folder: &Path,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> Vec<SyncAction> {
        self.run_handler(configured, callbacks, || {
            configured
                .handler
                .export_all(&configured.folder(folder), &configured.settings, options, callbacks)
        })
    }

    /// Every item the handler folders under `folder` hold.
    ///
    /// Unreadable files are skipped here; the handler reading them reports
    /// the failure.
    fn plan(&self, folder: &Path) -> Arc<PlannedItems> {
        let mut nodes = Vec::new();
        for handler in self.handlers.all() {
            let Ok(files) = self.store.files(&folder.join(handler.default_folder())) else {
                continue;
            };
            nodes.extend(files.iter().filter_map(|path| self.store.load(path).ok()));
        }
        let plan = PlannedItems::from_nodes(&nodes);
        debug!(folder = %folder.display(), items = plan.len(), "report plan");
        Arc::new(plan)
    }

    /// Reports one handler's folder.
    ///
    /// References between files in `folder` resolve as if the files were
    /// already imported.
    pub fn report_handler(
        &self,
        configured: &ConfiguredHandler,
        folder: &Path,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> Vec<SyncAction> {
        let planned;
        let options = if options.planned.is_some() {
            options
        } else {
            planned = options.clone().with_planned(self.plan(folder));
            &planned
        };
        let actions = self.run_handler(configured, callbacks, || {
            configured
                .handler
                .report(&configured.folder(folder), &configured.settings, options, callbacks)
        });
        if self.settings.report_debug {
            actions
        } else {
            actions.into_iter().filter(|a| a.change() != ChangeType::NoChange).collect()
        }
    }

    /// Imports one handler's folder (first pass only).
    pub fn import_handler(
        &self,
        configured: &ConfiguredHandler,
        folder: &Path,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> Vec<SyncAction> {
        let _paused = self.suppressor.pause();
        self.run_handler(configured, callbacks, || {
            configured
                .handler
                .import_all(&configured.folder(folder), &configured.settings, options, callbacks)
        })
    }

    pub(crate) fn version_check(&self, folder: &Path) -> Option<SyncAction> {
        let message = match self.store.check_version(folder) {
            Ok(None | Some(FormatCheck::Current)) => return None,
            Ok(Some(FormatCheck::Older(found))) => format!("folder was written by {found}, expected {FORMAT_VERSION}"),
            Ok(Some(FormatCheck::Newer(found))) => format!("folder was written by a newer version {found}"),
            Ok(Some(FormatCheck::Unknown)) => "folder version is unreadable".to_string(),
            Err(err) => err.to_string(),
        };
        warn!(folder = %folder.display(), %message, "format mismatch");
        Some(SyncAction::succeed(PIPELINE, "Version", VERSION_FILE, ChangeType::Mismatch).with_message(message))
    }

    /// Exports every handler in the set to `folder`.
    pub fn export(&self, folder: &Path, options: &SyncOptions, callbacks: &SyncCallbacks) -> BackOfficeResult<Vec<SyncAction>> {
        let handlers = self.handlers_for(options, HandlerAction::Export)?;
        self.set_phase(SyncPhase::Export);
        let mut actions = Vec::new();
        for configured in &handlers {
            actions.extend(self.export_handler(configured, folder, options, callbacks));
        }
        self.finish_export(folder)?;
        info!(handlers = handlers.len(), actions = actions.len(), "export finished");
        Ok(actions)
    }

    /// Stamps `folder` with the format version once every handler has
    /// exported.
    pub(crate) fn finish_export(&self, folder: &Path) -> BackOfficeResult<()> {
        self.store.write_version(folder, FORMAT_VERSION)?;
        self.set_phase(SyncPhase::Complete);
        Ok(())
    }

    /// Reports what importing `folder` would change.
    pub fn report(&self, folder: &Path, options: &SyncOptions, callbacks: &SyncCallbacks) -> BackOfficeResult<Vec<SyncAction>> {
        let handlers = self.handlers_for(options, HandlerAction::Report)?;
        self.set_phase(SyncPhase::Report);
        let mut actions: Vec<SyncAction> = self.version_check(folder).into_iter().collect();
        let options = options.clone().with_planned(self.plan(folder));
        for configured in &handlers {
            actions.extend(self.report_handler(configured, folder, &options, callbacks));
        }
        self.set_phase(SyncPhase::Complete);
        info!(handlers = handlers.len(), changes = actions.len(), "report finished");
        Ok(actions)
    }

    /// Imports `folder`: every handler's first pass, then the finishing phases.
    pub fn import(&self, folder: &Path, options: &SyncOptions, callbacks: &SyncCallbacks) -> BackOfficeResult<Vec<SyncAction>> {
        let _paused = self.suppressor.pause();
        let handlers = self.handlers_for(options, HandlerAction::Import)?;
        self.set_phase(SyncPhase::Import);

        let mut actions: Vec<SyncAction> = self.version_check(folder).into_iter().collect();
        for configured in &handlers {
            actions.extend(self.import_handler(configured, folder, options, callbacks));
        }
        self.import_finish(folder, actions, options)
    }

    /// Runs the second pass, post import and clean phases over first pass
    /// `actions`.
    pub fn import_finish(
        &self,
        folder: &Path,
        mut actions: Vec<SyncAction>,
        options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let _paused = self.suppressor.pause();
        let handlers = self.handlers_for(options, HandlerAction::Import)?;

        self.set_phase(SyncPhase::SecondPass);
        let mut nodes: HashMap<String, XElement> = HashMap::new();
        for configured in handlers.iter().filter(|c| c.handler.is_two_pass()) {
            let handler = configured.handler.as_ref();
            let pending: Vec<SyncAction> = actions
                .iter()
                .filter(|a| a.handler_alias() == handler.alias() && a.requires_second_pass() && a.success())
                .cloned()
                .collect();
            let mut updates = Vec::new();
            for action in &pending {
                let Some(file) = action.file_name() else { continue };
                let node = match nodes.get(file) {
                    Some(node) => node.clone(),
                    None => match self.store.load(Path::new(file)) {
                        Ok(node) => {
                            nodes.insert(file.to_string(), node.clone());
                            node
                        }
                        Err(err) => {
                            updates.push(SyncAction::from_error(handler.alias(), handler.item_type(), action.name(), &err).with_key(action.key()));
                            continue;
                        }
                    },
                };
                match handler.import_second_pass(&node, action, &configured.settings, options) {
                    Ok(result) => updates.extend(result),
                    Err(err) => updates.push(Self::handler_failed(handler, &err)),
                }
            }
            replace_actions(&mut actions, updates);
        }

        self.finish_phases(folder, &handlers, &mut actions, options);
        self.write_history(folder, &actions);
        self.set_phase(SyncPhase::Complete);

        let failed = actions.iter().filter(|a| a.is_failure()).count();
        info!(actions = actions.len(), failed, "import finished");
        Ok(actions)
    }

    fn finish_phases(&self, folder: &Path, handlers: &[ConfiguredHandler], actions: &mut Vec<SyncAction>, options: &SyncOptions) {
        self.set_phase(SyncPhase::PostImport);
        for configured in handlers.iter().filter(|c| c.handler.has_post_import()) {
            let handler = configured.handler.as_ref();
            match handler.process_post_import(actions, &configured.settings, options) {
                Ok(updates) => replace_actions(actions, updates),
                Err(err) => actions.push(Self::handler_failed(handler, &err)),
            }
        }

        self.set_phase(SyncPhase::Clean);
        for configured in handlers.iter().filter(|c| c.handler.has_clean()) {
            let handler = configured.handler.as_ref();
            match handler.process_clean(&configured.folder(folder), actions, &configured.settings, options) {
                Ok(cleaned) => actions.extend(cleaned),
                Err(err) => actions.push(Self::handler_failed(handler, &err)),
            }
        }
    }

    /// Imports a list of nodes, routing each to the handler for its root
    /// element. Both passes run over the supplied nodes.
    pub fn import_partial(&self, nodes: &[XElement], options: &SyncOptions) -> BackOfficeResult<Vec<SyncAction>> {
        let _paused = self.suppressor.pause();
        let handlers = self.handlers_for(options, HandlerAction::Import)?;

        let mut routed: Vec<(usize, &ConfiguredHandler, &XElement)> = Vec::new();
        let mut actions = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            match handlers.iter().find(|c| c.handler.item_type() == node.name()) {
                Some(configured) => routed.push((index, configured, node)),
                None => actions.push(SyncAction::fail(
                    PIPELINE,
                    node.name(),
                    node.alias(),
                    ChangeType::Fail,
                    format!("no handler for {}", node.name()),
                )),
            }
        }
        routed.sort_by_key(|(index, c, node)| (c.handler.priority(), node.level(), *index));

        self.set_phase(SyncPhase::Import);
        let mut first: Vec<(usize, SyncAction)> = Vec::new();
        for (index, configured, node) in &routed {
            for action in configured.handler.import_element(node, "", &configured.settings, options) {
                first.push((*index, action));
            }
        }

        self.set_phase(SyncPhase::SecondPass);
        let mut updates = Vec::new();
        for (index, action) in first.iter().filter(|(_, a)| a.requires_second_pass() && a.success()) {
            let Some((_, configured, node)) = routed.iter().find(|(i, _, _)| i == index) else {
                continue;
            };
            match configured.handler.import_second_pass(node, action, &configured.settings, options) {
                Ok(result) => updates.extend(result),
                Err(err) => updates.push(Self::handler_failed(configured.handler.as_ref(), &err)),
            }
        }
        actions.extend(first.into_iter().map(|(_, a)| a));
        replace_actions(&mut actions, updates);

        self.set_phase(SyncPhase::Complete);
        Ok(actions)
    }

    fn write_history(&self, folder: &Path, actions: &[SyncAction]) {
        if !self.settings.enable_history {
            return;
        }
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = folder.join(HISTORY_FOLDER).join(format!("import-{stamp}.json"));
        let written = serde_json::to_string_pretty(actions)
            .map_err(BackOfficeError::from)
            .and_then(|text| {
                std::fs::create_dir_all(folder.join(HISTORY_FOLDER))?;
                std::fs::write(&path, text)?;
                Ok(())
            });
        if let Err(err) = written {
            warn!(path = %path.display(), error = %err, "history not written");
        }
    }

    /// Exports an item the host just saved. `None` while imports have
    /// notifications paused or no handler is set to export on save.
    pub fn item_saved(&self, item_type: &str, key: Uuid, folder: &Path) -> BackOfficeResult<Option<Vec<SyncAction>>> {
        if self.suppressor.is_paused() {
            debug!(item_type, %key, "save ignored while paused");
            return Ok(None);
        }
        let Some(configured) = self.configured(item_type, &SyncOptions::default(), HandlerAction::Save)? else {
            return Ok(None);
        };
        let actions = configured
            .handler
            .export_item(key, &configured.folder(folder), &configured.settings)?;
        Ok(Some(actions))
    }

    /// Writes a tombstone for an item the host just deleted.
    pub fn item_deleted(
        &self,
        item_type: &str,
        key: Uuid,
        alias: &str,
        folder: &Path,
    ) -> BackOfficeResult<Option<Vec<SyncAction>>> {
        if self.suppressor.is_paused() {
            return Ok(None);
        }
        let Some(configured) = self.configured(item_type, &SyncOptions::default(), HandlerAction::Save)? else {
            return Ok(None);
        };
        let actions = configured
            .handler
            .export_delete(key, alias, &configured.folder(folder), &configured.settings)?;
        Ok(Some(actions))
    }

    /// Everything that must be synced with an item.
    pub fn dependencies(&self, item_type: &str, key: Uuid, flags: DependencyFlags) -> BackOfficeResult<Vec<SyncDependency>> {
        let handler = self
            .handlers
            .for_item_type(item_type)
            .ok_or_else(|| BackOfficeError::HandlerNotFound(item_type.to_string()))?;
        handler.get_dependencies(key, flags)
    }

    /// Cuts results down for display using the summary settings.
    pub fn summarise(&self, actions: &[SyncAction]) -> Vec<SyncAction> {
        let strict = self.settings.summary_dashboard || actions.len() > self.settings.summary_limit;
        summarise_actions(actions, strict)
    }
}

/// A service shared between requests.
pub type SharedSyncService = Arc<SyncService>;
