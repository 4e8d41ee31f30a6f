//! Handlers: one per entity kind, driving its serializer against a folder.
//!
//! Handlers are registered explicitly in a [`HandlerFactory`]; the factory
//! filters them per handler set, group and action and hands them out in
//! priority order.

mod defaults;
mod entity;

pub use defaults::{default_handlers, groups};
pub use entity::{EntityHandler, HandlerInfo};

use crate::action::SyncAction;
use crate::callbacks::{SyncCallbacks, SyncOptions};
use crate::error::{BackOfficeError, BackOfficeResult};
use crate::settings::{HandlerAction, HandlerSetSettings, HandlerSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use usync_core::dependency::{DependencyFlags, SyncDependency};
use usync_xml::XElement;
use uuid::Uuid;

/// Imports, exports and reports one kind of item.
///
/// Item level failures are returned as failed actions. An `Err` means the
/// handler as a whole could not run (for example its folder is unreadable).
pub trait SyncHandler: Send + Sync {
    /// Unique alias, e.g. `dataTypeHandler`.
    fn alias(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Icon shown next to the handler.
    fn icon(&self) -> &str;

    /// Lower priorities run first.
    fn priority(&self) -> i32;

    /// Folder name under the sync root.
    fn default_folder(&self) -> &str;

    /// Group the handler belongs to.
    fn group(&self) -> &str;

    /// Root element name of the handler's files.
    fn item_type(&self) -> &str;

    /// Whether items can need a second pass.
    fn is_two_pass(&self) -> bool {
        false
    }

    /// Whether the handler has a post import step.
    fn has_post_import(&self) -> bool {
        false
    }

    /// Whether the handler processes clean markers.
    fn has_clean(&self) -> bool {
        false
    }

    /// Writes every item to `folder`.
    fn export_all(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>>;

    /// Writes one item.
    fn export_item(&self, key: Uuid, folder: &Path, settings: &HandlerSettings) -> BackOfficeResult<Vec<SyncAction>>;

    /// Replaces a deleted item's file with a tombstone.
    fn export_delete(
        &self,
        key: Uuid,
        alias: &str,
        folder: &Path,
        settings: &HandlerSettings,
    ) -> BackOfficeResult<Vec<SyncAction>>;

    /// Imports every file in `folder` (first pass).
    fn import_all(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>>;

    /// Imports one node (first pass).
    fn import_element(
        &self,
        node: &XElement,
        file: &str,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> Vec<SyncAction>;

    /// Runs the second pass for an item flagged by the first.
    ///
    /// `node` is the node the first pass imported `action` from.
    fn import_second_pass(
        &self,
        node: &XElement,
        action: &SyncAction,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>>;

    /// Reports what importing `folder` would change.
    fn report(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>>;

    /// Reports what importing one node would change.
    fn report_element(
        &self,
        node: &XElement,
        file: &str,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> Vec<SyncAction>;

    /// Runs after every handler has imported.
    fn process_post_import(
        &self,
        _actions: &[SyncAction],
        _settings: &HandlerSettings,
        _options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        Ok(Vec::new())
    }

    /// Removes items the folder's clean markers no longer list.
    fn process_clean(
        &self,
        _folder: &Path,
        _actions: &[SyncAction],
        _settings: &HandlerSettings,
        _options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        Ok(Vec::new())
    }

    /// Items that must be synced with the item `key`.
    fn get_dependencies(&self, key: Uuid, flags: DependencyFlags) -> BackOfficeResult<Vec<SyncDependency>>;
}

/// A handler with its effective settings for a run.
#[derive(Clone)]
pub struct ConfiguredHandler {
    /// The handler.
    pub handler: Arc<dyn SyncHandler>,
    /// Settings from the handler set.
    pub settings: HandlerSettings,
}

impl std::fmt::Debug for ConfiguredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredHandler")
            .field("alias", &self.handler.alias())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ConfiguredHandler {
    /// Group, honouring a settings override.
    pub fn group(&self) -> &str {
        self.settings.group.as_deref().unwrap_or_else(|| self.handler.group())
    }

    /// The handler's folder under `root`.
    pub fn folder(&self, root: &Path) -> PathBuf {
        root.join(self.handler.default_folder())
    }
}

/// Registry of handlers.
#[derive(Default)]
pub struct HandlerFactory {
    handlers: Vec<Arc<dyn SyncHandler>>,
}

impl std::fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|h| h.alias())).finish()
    }
}

impl HandlerFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Aliases must be unique.
    pub fn register(&mut self, handler: Arc<dyn SyncHandler>) -> BackOfficeResult<()> {
        if self.handlers.iter().any(|h| h.alias() == handler.alias()) {
            return Err(BackOfficeError::DuplicateHandler(handler.alias().to_string()));
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// A handler by alias.
    pub fn get(&self, alias: &str) -> BackOfficeResult<Arc<dyn SyncHandler>> {
        self.handlers
            .iter()
            .find(|h| h.alias().eq_ignore_ascii_case(alias))
            .cloned()
            .ok_or_else(|| BackOfficeError::HandlerNotFound(alias.to_string()))
    }

    /// The handler for files with root element `item_type`.
    pub fn for_item_type(&self, item_type: &str) -> Option<Arc<dyn SyncHandler>> {
        self.handlers.iter().find(|h| h.item_type() == item_type).cloned()
    }

    /// Every handler in priority order.
    pub fn all(&self) -> Vec<Arc<dyn SyncHandler>> {
        let mut handlers = self.handlers.clone();
        handlers.sort_by_key(|h| h.priority());
        handlers
    }

    /// Handlers that run for `action` in `set`, in priority order.
    pub fn handlers_for(
        &self,
        set: &HandlerSetSettings,
        group: Option<&str>,
        action: HandlerAction,
    ) -> Vec<ConfiguredHandler> {
        self.all()
            .into_iter()
            .map(|handler| ConfiguredHandler {
                settings: set.settings_for(handler.alias()),
                handler,
            })
            .filter(|c| set.includes(c.handler.alias(), c.group()))
            .filter(|c| group.is_none_or(|g| g.is_empty() || c.group().eq_ignore_ascii_case(g)))
            .filter(|c| c.settings.allows(action))
            .collect()
    }
}
