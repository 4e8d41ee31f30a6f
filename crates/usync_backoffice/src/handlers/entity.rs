//! The generic handler used for every built in entity kind.

use super::SyncHandler;
use crate::action::SyncAction;
use crate::callbacks::{SyncCallbacks, SyncOptions};
use crate::error::{BackOfficeError, BackOfficeResult};
use crate::settings::HandlerSettings;
use crate::store::SyncFileStore;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use usync_core::dependency::{sort_dependencies, topological_sort, DependencyChecker, DependencyFlags, SyncDependency};
use usync_core::entity::SyncEntity;
use usync_core::serialization::{SerializerFlags, SerializerOptions, SyncSerializer};
use usync_core::services::EntityService;
use usync_core::tracking::{tracker_for, SyncXmlTracker, TrackerOptions};
use usync_core::{ChangeDetailType, ChangeType, CoreError};
use usync_xml::{same_xml, EmptyAction, XElement};
use uuid::Uuid;

/// Fixed description of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    /// Unique alias.
    pub alias: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Icon.
    pub icon: &'static str,
    /// Folder under the sync root.
    pub folder: &'static str,
    /// Group.
    pub group: &'static str,
    /// Priority; lower runs first.
    pub priority: i32,
    /// Items can need a second pass.
    pub two_pass: bool,
    /// Items placed at the root for a missing parent are retried after the run.
    pub post_import: bool,
    /// Clean markers are processed on import.
    pub clean: bool,
}

/// Keys an item must be imported after, read from its node.
pub type OrderingFn = fn(&XElement) -> Vec<Uuid>;

/// A handler for one entity kind, built from its serializer, host service
/// and dependency checker.
pub struct EntityHandler<E: SyncEntity> {
    info: HandlerInfo,
    serializer: Arc<dyn SyncSerializer<E>>,
    service: Arc<dyn EntityService<E>>,
    checker: Arc<dyn DependencyChecker<E> + Send + Sync>,
    tracker: Option<SyncXmlTracker>,
    store: SyncFileStore,
    ordering: Option<OrderingFn>,
}

impl<E: SyncEntity> std::fmt::Debug for EntityHandler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandler").field("info", &self.info).finish_non_exhaustive()
    }
}

fn file_label(path: &Path) -> String {
    path.display().to_string()
}

impl<E: SyncEntity> EntityHandler<E> {
    /// Creates a handler.
    pub fn new(
        info: HandlerInfo,
        serializer: Arc<dyn SyncSerializer<E>>,
        service: Arc<dyn EntityService<E>>,
        checker: Arc<dyn DependencyChecker<E> + Send + Sync>,
    ) -> Self {
        let tracker = tracker_for(serializer.item_type());
        Self {
            info,
            serializer,
            service,
            checker,
            tracker,
            store: SyncFileStore::default(),
            ordering: None,
        }
    }

    /// Uses a different file store.
    pub fn with_store(mut self, store: SyncFileStore) -> Self {
        self.store = store;
        self
    }

    /// Orders imports so that the keys `ordering` returns for a node are
    /// imported before it.
    pub fn with_ordering(mut self, ordering: OrderingFn) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// The handler description.
    pub fn info(&self) -> &HandlerInfo {
        &self.info
    }

    fn items(&self) -> BackOfficeResult<Vec<E>> {
        let kind = self.serializer.kind();
        Ok(self
            .service
            .get_all()?
            .into_iter()
            .filter(|item| item.kind() == kind)
            .collect())
    }

    fn get(&self, key: Uuid) -> BackOfficeResult<E> {
        self.service
            .get(key)?
            .filter(|item| item.kind() == self.serializer.kind())
            .ok_or_else(|| BackOfficeError::item_not_found(self.serializer.item_type(), key))
    }

    /// Names of the item's ancestors, root first.
    fn ancestors(&self, item: &E) -> BackOfficeResult<Vec<String>> {
        let mut names = Vec::new();
        let mut seen = HashSet::from([item.key()]);
        let mut parent = item.parent_key();
        while let Some(key) = parent.filter(|k| seen.insert(*k)) {
            let Some(ancestor) = self.service.get(key)? else {
                break;
            };
            names.push(ancestor.alias().to_string());
            parent = ancestor.parent_key();
        }
        names.reverse();
        Ok(names)
    }

    fn item_path(&self, item: &E, folder: &Path, settings: &HandlerSettings) -> BackOfficeResult<PathBuf> {
        let ancestors = if settings.use_flat_structure {
            Vec::new()
        } else {
            self.ancestors(item)?
        };
        Ok(self.store.item_path(folder, item.key(), item.alias(), &ancestors, settings))
    }

    fn serializer_options(
        &self,
        settings: &HandlerSettings,
        options: &SyncOptions,
        extra: SerializerFlags,
    ) -> SerializerOptions {
        let mut flags = extra;
        if options.force {
            flags |= SerializerFlags::FORCE;
        }
        if settings.fail_on_missing_parent {
            flags |= SerializerFlags::FAIL_MISSING_PARENT;
        }
        if settings.setting_bool("NoRemove", false) {
            flags |= SerializerFlags::NO_REMOVE;
        }
        if settings.setting_bool("CreateOnly", false) {
            flags |= SerializerFlags::CREATE_ONLY;
        }
        if !self.info.two_pass || settings.setting_bool("OnePass", false) {
            flags |= SerializerFlags::ONE_PASS;
        }
        SerializerOptions {
            flags,
            settings: settings.settings.clone(),
            planned: options.planned.clone(),
        }
    }

    fn fail(&self, name: &str, error: &dyn std::error::Error) -> SyncAction {
        SyncAction::from_error(self.info.alias, self.serializer.item_type(), name, error)
    }

    /// Reads every file, turning unreadable ones into failed actions.
    fn load_nodes(&self, folder: &Path) -> BackOfficeResult<(Vec<(PathBuf, XElement)>, Vec<SyncAction>)> {
        let mut nodes = Vec::new();
        let mut failures = Vec::new();
        for path in self.store.files(folder)? {
            match self.store.load(&path) {
                Ok(node) => nodes.push((path, node)),
                Err(err) => {
                    warn!(handler = self.info.alias, file = %path.display(), error = %err, "unreadable sync file");
                    failures.push(self.fail(&file_label(&path), &err).with_file(file_label(&path)));
                }
            }
        }
        Ok((nodes, failures))
    }

    /// Sorts nodes by level then path, then by the handler's ordering edges.
    fn order_nodes(&self, mut nodes: Vec<(PathBuf, XElement)>) -> Result<Vec<(PathBuf, XElement)>, SyncAction> {
        nodes.sort_by(|(a_path, a), (b_path, b)| a.level().cmp(&b.level()).then_with(|| a_path.cmp(b_path)));

        let Some(ordering) = self.ordering else {
            return Ok(nodes);
        };

        let keys: Vec<Uuid> = nodes.iter().filter_map(|(_, n)| n.key().ok()).collect();
        let known: HashSet<Uuid> = keys.iter().copied().collect();
        let edges: Vec<(Uuid, Uuid)> = nodes
            .iter()
            .filter_map(|(_, node)| node.key().ok().map(|key| (key, ordering(node))))
            .flat_map(|(key, before)| before.into_iter().map(move |b| (b, key)))
            .filter(|(before, _)| known.contains(before))
            .collect();

        let Some(order) = topological_sort(&keys, &edges) else {
            let members: Vec<String> = nodes
                .iter()
                .filter(|(_, n)| !n.is_empty_item())
                .map(|(_, n)| n.alias().to_string())
                .collect();
            let error = CoreError::DependencyCycle { members };
            warn!(handler = self.info.alias, error = %error, "cannot order import");
            return Err(self.fail(self.info.name, &error));
        };

        let position: HashMap<Uuid, usize> = order.into_iter().enumerate().map(|(i, k)| (k, i)).collect();
        nodes.sort_by_key(|(_, n)| n.key().ok().and_then(|k| position.get(&k).copied()).unwrap_or(usize::MAX));
        Ok(nodes)
    }

    fn export(
        &self,
        item: &E,
        folder: &Path,
        settings: &HandlerSettings,
        previous: Option<&PathBuf>,
        claimed: &mut HashSet<PathBuf>,
    ) -> BackOfficeResult<SyncAction> {
        let attempt = self.serializer.serialize(item);
        let Some(node) = attempt.item().filter(|_| attempt.success()) else {
            return Ok(SyncAction::from_attempt(self.info.alias, self.serializer.item_type(), item.key(), &attempt));
        };

        let mut path = self.item_path(item, folder, settings)?;
        if claimed.contains(&path) || self.owned_by_other(&path, item.key()) {
            let keyed = self.store.keyed_path(&path, item.key());
            debug!(handler = self.info.alias, item = item.name(), file = %keyed.display(), "name clash, using keyed file");
            path = keyed;
        }
        claimed.insert(path.clone());
        let unchanged = self.store.load(&path).is_ok_and(|current| same_xml(&current, node));
        let change = if unchanged {
            ChangeType::NoChange
        } else {
            self.store.save(&path, node)?;
            ChangeType::Export
        };
        if let Some(old) = previous.filter(|old| **old != path) {
            debug!(handler = self.info.alias, from = %old.display(), to = %path.display(), "item moved");
            self.store.delete(old)?;
        }

        Ok(
            SyncAction::from_attempt(self.info.alias, self.serializer.item_type(), item.key(), &attempt)
                .with_change(change)
                .with_file(file_label(&path)),
        )
    }

    /// Whether the file at `path` holds a different item that still exists.
    fn owned_by_other(&self, path: &Path, key: Uuid) -> bool {
        let Ok(current) = self.store.load(path) else {
            return false;
        };
        match current.key() {
            Ok(other) if other != key && !current.is_empty_item() => self
                .service
                .get(other)
                .ok()
                .flatten()
                .is_some_and(|item| item.kind() == self.serializer.kind()),
            _ => false,
        }
    }

    fn write_clean_markers(&self, items: &[E], folder: &Path) -> BackOfficeResult<()> {
        let mut parents: Vec<(Uuid, String)> = vec![(Uuid::nil(), String::new())];
        for item in items {
            if let Some(parent) = item.parent_key() {
                if !parents.iter().any(|(k, _)| *k == parent) {
                    let alias = items
                        .iter()
                        .find(|i| i.key() == parent)
                        .map(|i| i.alias().to_string())
                        .unwrap_or_default();
                    parents.push((parent, alias));
                }
            }
        }
        for (key, alias) in parents {
            let marker = XElement::empty(EmptyAction::Clean, &alias, key);
            self.store.save(&self.store.clean_path(folder, key), &marker)?;
        }
        Ok(())
    }

    fn import_node(&self, node: &XElement, file: &str, options: &SerializerOptions) -> SyncAction {
        let attempt = self.serializer.deserialize(node, options);
        let key = attempt
            .item()
            .map(SyncEntity::key)
            .or_else(|| node.key().ok())
            .unwrap_or_default();
        let action = SyncAction::from_attempt(self.info.alias, self.serializer.item_type(), key, &attempt);
        if file.is_empty() {
            action
        } else {
            action.with_file(file)
        }
    }
}

impl<E: SyncEntity> SyncHandler for EntityHandler<E> {
    fn alias(&self) -> &str {
        self.info.alias
    }

    fn name(&self) -> &str {
        self.info.name
    }

    fn icon(&self) -> &str {
        self.info.icon
    }

    fn priority(&self) -> i32 {
        self.info.priority
    }

    fn default_folder(&self) -> &str {
        self.info.folder
    }

    fn group(&self) -> &str {
        self.info.group
    }

    fn item_type(&self) -> &str {
        self.serializer.item_type()
    }

    fn is_two_pass(&self) -> bool {
        self.info.two_pass
    }

    fn has_post_import(&self) -> bool {
        self.info.post_import
    }

    fn has_clean(&self) -> bool {
        self.info.clean
    }

    fn export_all(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let items = self.items()?;
        let mut existing: HashMap<Uuid, PathBuf> = HashMap::new();
        for path in self.store.files(folder)? {
            if let Some(key) = self.store.load(&path).ok().and_then(|n| n.key().ok()) {
                existing.insert(key, path);
            }
        }

        let total = items.len();
        let mut actions = Vec::with_capacity(total);
        let mut claimed = HashSet::new();
        for (count, item) in items.iter().enumerate() {
            callbacks.update(item.name(), count, total);
            let action = self
                .export(item, folder, settings, existing.get(&item.key()), &mut claimed)
                .unwrap_or_else(|err| self.fail(item.name(), &err));
            actions.push(action);
        }

        if settings.create_clean {
            self.write_clean_markers(&items, folder)?;
        }

        if options.clean {
            let keep: HashSet<Uuid> = items.iter().map(SyncEntity::key).collect();
            for path in self.store.remove_orphans(folder, &keep)? {
                let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
                actions.push(
                    SyncAction::succeed(self.info.alias, self.serializer.item_type(), name, ChangeType::Clean)
                        .with_file(file_label(&path)),
                );
            }
        }

        info!(handler = self.info.alias, count = total, "export complete");
        Ok(actions)
    }

    fn export_item(&self, key: Uuid, folder: &Path, settings: &HandlerSettings) -> BackOfficeResult<Vec<SyncAction>> {
        let item = self.get(key)?;
        let previous = self.store.find_by_key(folder, key)?;
        Ok(vec![self.export(&item, folder, settings, previous.as_ref(), &mut HashSet::new())?])
    }

    fn export_delete(
        &self,
        key: Uuid,
        alias: &str,
        folder: &Path,
        settings: &HandlerSettings,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let path = match self.store.find_by_key(folder, key)? {
            Some(path) => path,
            None => self.store.item_path(folder, key, alias, &[], settings),
        };
        self.store.save(&path, &XElement::empty(EmptyAction::Delete, alias, key))?;
        Ok(vec![
            SyncAction::succeed(self.info.alias, self.serializer.item_type(), alias, ChangeType::Delete)
                .with_key(key)
                .with_file(file_label(&path)),
        ])
    }

    fn import_all(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let (nodes, mut actions) = self.load_nodes(folder)?;
        let nodes = match self.order_nodes(nodes) {
            Ok(nodes) => nodes,
            Err(failure) => {
                actions.push(failure);
                return Ok(actions);
            }
        };

        let total = nodes.len();
        for (count, (path, node)) in nodes.iter().enumerate() {
            callbacks.update(node.alias(), count, total);
            actions.extend(self.import_element(node, &file_label(path), settings, options));
        }

        let failed = actions.iter().filter(|a| a.is_failure()).count();
        info!(handler = self.info.alias, count = total, failed, "import complete");
        Ok(actions)
    }

    fn import_element(
        &self,
        node: &XElement,
        file: &str,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> Vec<SyncAction> {
        let options = self.serializer_options(settings, options, SerializerFlags::empty());
        vec![self.import_node(node, file, &options)]
    }

    fn import_second_pass(
        &self,
        node: &XElement,
        action: &SyncAction,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let options = self.serializer_options(settings, options, SerializerFlags::empty());
        let attempt = self.serializer.deserialize_second_pass(node, &options);

        let change = match (action.change(), attempt.change()) {
            (ChangeType::Create, later) if !later.is_failure() => ChangeType::Create,
            (first, ChangeType::NoChange) => first,
            (_, later) => later,
        };
        let mut details = action.details().to_vec();
        details.extend_from_slice(attempt.details());

        debug!(handler = self.info.alias, item = action.name(), "second pass");
        let result = SyncAction::from_attempt(self.info.alias, self.serializer.item_type(), action.key(), &attempt)
            .with_change(change)
            .with_details(details);
        Ok(vec![match action.file_name() {
            Some(file) => result.with_file(file),
            None => result,
        }])
    }

    fn report(
        &self,
        folder: &Path,
        settings: &HandlerSettings,
        options: &SyncOptions,
        callbacks: &SyncCallbacks,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        let (nodes, mut actions) = self.load_nodes(folder)?;
        let nodes = match self.order_nodes(nodes) {
            Ok(nodes) => nodes,
            Err(failure) => {
                actions.push(failure);
                return Ok(actions);
            }
        };

        let total = nodes.len();
        for (count, (path, node)) in nodes.iter().enumerate() {
            callbacks.update(node.alias(), count, total);
            actions.extend(self.report_element(node, &file_label(path), settings, options));
        }
        Ok(actions)
    }

    fn report_element(
        &self,
        node: &XElement,
        file: &str,
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> Vec<SyncAction> {
        let options = self.serializer_options(settings, options, SerializerFlags::DO_NOT_SAVE);
        let action = self.import_node(node, file, &options);
        if action.is_failure() || action.change() == ChangeType::NoChange {
            return vec![action];
        }

        let Some(tracker) = &self.tracker else {
            return vec![action];
        };
        let existing = self
            .serializer
            .find_item(node)
            .ok()
            .flatten()
            .and_then(|item| self.serializer.serialize(&item).into_item());
        let mut details = tracker.get_changes(node, existing.as_ref(), &TrackerOptions::default());
        details.extend(
            action
                .details()
                .iter()
                .filter(|d| matches!(d.change(), ChangeDetailType::Warning | ChangeDetailType::Error))
                .cloned(),
        );
        vec![action.with_details(details)]
    }

    fn process_post_import(
        &self,
        actions: &[SyncAction],
        settings: &HandlerSettings,
        options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        if !self.info.post_import {
            return Ok(Vec::new());
        }
        let parent_path = format!("{}/Parent", self.serializer.item_type());
        let mut results = Vec::new();
        for action in actions.iter().filter(|a| a.handler_alias() == self.info.alias && a.success()) {
            let placed_at_root = action
                .details()
                .iter()
                .any(|d| d.change() == ChangeDetailType::Warning && d.path() == parent_path);
            let Some(file) = action.file_name().filter(|_| placed_at_root) else {
                continue;
            };
            let node = self.store.load(Path::new(file))?;
            let retry = self.serializer_options(settings, options, SerializerFlags::ONE_PASS);
            let result = self.import_node(&node, file, &retry);
            if !result.details().iter().any(|d| d.path() == parent_path) {
                debug!(handler = self.info.alias, item = result.name(), "parent resolved after import");
                results.push(result);
            }
        }
        Ok(results)
    }

    fn process_clean(
        &self,
        folder: &Path,
        actions: &[SyncAction],
        _settings: &HandlerSettings,
        _options: &SyncOptions,
    ) -> BackOfficeResult<Vec<SyncAction>> {
        if !self.info.clean {
            return Ok(Vec::new());
        }
        let markers = self.store.clean_markers(folder)?;
        if markers.is_empty() {
            return Ok(Vec::new());
        }

        let imported: HashSet<Uuid> = actions
            .iter()
            .filter(|a| a.handler_alias() == self.info.alias && !a.key().is_nil())
            .map(SyncAction::key)
            .collect();
        let kind = self.serializer.kind();
        let mut results = Vec::new();
        for (path, marker) in markers {
            let parent = marker.key()?;
            let parent = (!parent.is_nil()).then_some(parent);
            for child in self.service.children(parent)? {
                if child.kind() != kind || imported.contains(&child.key()) {
                    continue;
                }
                let message = format!("not in {}", file_label(&path));
                self.service.delete(child.key())?;
                results.push(
                    SyncAction::succeed(self.info.alias, self.serializer.item_type(), child.name(), ChangeType::Clean)
                        .with_key(child.key())
                        .with_message(message),
                );
            }
        }
        info!(handler = self.info.alias, removed = results.len(), "clean complete");
        Ok(results)
    }

    fn get_dependencies(&self, key: Uuid, flags: DependencyFlags) -> BackOfficeResult<Vec<SyncDependency>> {
        let item = self.get(key)?;
        Ok(sort_dependencies(self.checker.get_dependencies(&item, flags)?))
    }
}
