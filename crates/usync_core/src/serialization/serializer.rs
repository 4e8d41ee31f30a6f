//! The generic serializer.

use super::{EntityMapper, MapContext, Mapped, Pass, SerializerFlags, SerializerOptions};
use crate::entity::{EntityKind, SyncEntity};
use crate::error::{CoreError, CoreResult};
use crate::model::{ChangeType, SyncAttempt, SyncChange};
use crate::services::{EntityLookup, EntityService};
use crate::udi::Udi;
use std::sync::Arc;
use tracing::{debug, warn};
use usync_xml::{same_xml, EmptyAction, XElement};

/// Converts entities of one kind to and from sync files.
pub trait SyncSerializer<E>: Send + Sync {
    /// Root element name handled.
    fn item_type(&self) -> &str;

    /// Entity kind handled.
    fn kind(&self) -> EntityKind;

    /// Writes an item.
    fn serialize(&self, item: &E) -> SyncAttempt<XElement>;

    /// Writes a tombstone for an item.
    fn serialize_empty(&self, item: &E, action: EmptyAction) -> XElement;

    /// Reads a node and applies it (first pass).
    fn deserialize(&self, node: &XElement, options: &SerializerOptions) -> SyncAttempt<E>;

    /// Re-reads a node, resolving references deferred by the first pass.
    fn deserialize_second_pass(&self, node: &XElement, options: &SerializerOptions) -> SyncAttempt<E>;

    /// Whether importing the node would change anything.
    fn is_current(&self, node: &XElement, options: &SerializerOptions) -> ChangeType;

    /// The item a node describes, if it exists.
    fn find_item(&self, node: &XElement) -> CoreResult<Option<E>>;

    /// Returns true if the node is for this serializer and has a valid key.
    fn is_valid(&self, node: &XElement) -> bool {
        (node.name() == self.item_type() || node.is_empty_item()) && node.key().is_ok()
    }
}

/// A [`SyncSerializer`] built from an [`EntityMapper`] and the host services.
pub struct XmlSerializer<M: EntityMapper> {
    mapper: M,
    service: Arc<dyn EntityService<M::Entity>>,
    lookup: Arc<dyn EntityLookup>,
}

impl<M: EntityMapper> std::fmt::Debug for XmlSerializer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlSerializer")
            .field("item_type", &self.mapper.item_type())
            .finish_non_exhaustive()
    }
}

fn display_name(node: &XElement) -> String {
    match node.alias() {
        "" => node.attr("Key").unwrap_or("(unknown)").to_string(),
        alias => alias.to_string(),
    }
}

impl<M: EntityMapper> XmlSerializer<M> {
    /// Creates a serializer.
    pub fn new(
        mapper: M,
        service: Arc<dyn EntityService<M::Entity>>,
        lookup: Arc<dyn EntityLookup>,
    ) -> Self {
        Self {
            mapper,
            service,
            lookup,
        }
    }

    /// The mapper.
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    fn by_key(&self, node: &XElement) -> CoreResult<Option<M::Entity>> {
        let key = node.key()?;
        Ok(self
            .service
            .get(key)?
            .filter(|item| item.kind() == self.mapper.kind()))
    }

    /// Finds by key, then by alias for kinds where aliases are unique.
    fn find_existing(&self, node: &XElement) -> CoreResult<Option<M::Entity>> {
        if let Some(item) = self.by_key(node)? {
            return Ok(Some(item));
        }
        let alias = node.alias();
        if alias.is_empty() || matches!(self.mapper.kind(), EntityKind::Document | EntityKind::Media) {
            return Ok(None);
        }
        Ok(self
            .service
            .get_all()?
            .into_iter()
            .find(|item| item.kind() == self.mapper.kind() && item.alias().eq_ignore_ascii_case(alias)))
    }

    fn unchanged(&self, old: &M::Entity, new: &M::Entity) -> CoreResult<bool> {
        Ok(same_xml(&self.mapper.to_xml(old)?, &self.mapper.to_xml(new)?))
    }

    fn deserialize_empty(
        &self,
        node: &XElement,
        options: &SerializerOptions,
    ) -> CoreResult<SyncAttempt<M::Entity>> {
        let name = display_name(node);
        match node.empty_action() {
            Some(EmptyAction::Delete) => match self.by_key(node)? {
                Some(item) => {
                    let save = !options.has(SerializerFlags::DO_NOT_SAVE);
                    if save {
                        self.service.delete(item.key())?;
                        debug!(item = %name, "deleted by tombstone");
                    }
                    Ok(SyncAttempt::succeed(name, ChangeType::Delete)
                        .with_item(item)
                        .with_saved(save))
                }
                None => Ok(SyncAttempt::succeed(name, ChangeType::NoChange)
                    .with_message("item already removed")),
            },
            Some(EmptyAction::Rename) | Some(EmptyAction::Clean) => {
                Ok(SyncAttempt::succeed(name, ChangeType::NoChange))
            }
            None => Err(CoreError::invalid_node(
                "tombstone without a valid Change attribute",
            )),
        }
    }

    fn deserialize_item(
        &self,
        node: &XElement,
        options: &SerializerOptions,
        pass: Pass,
    ) -> CoreResult<SyncAttempt<M::Entity>> {
        if node.name() != self.mapper.item_type() {
            return Err(CoreError::WrongItemType {
                expected: self.mapper.item_type().to_string(),
                found: node.name().to_string(),
            });
        }
        node.key()?;
        let name = display_name(node);

        let existing = self.find_existing(node)?;
        if options.has(SerializerFlags::CREATE_ONLY) {
            if let Some(item) = existing {
                return Ok(SyncAttempt::succeed(name, ChangeType::NoChange)
                    .with_item(item)
                    .with_message("item exists and create only is set"));
            }
        }

        let planned = options.planned.as_deref().map(|plan| plan.over(self.lookup.as_ref()));
        let lookup: &dyn EntityLookup = match &planned {
            Some(planned) => planned,
            None => self.lookup.as_ref(),
        };
        let ctx = MapContext::new(lookup, options.flags, pass);
        let Mapped {
            mut item,
            pending,
            mut details,
        } = self.mapper.from_xml(node, existing.as_ref(), &ctx)?;

        if let Some(parent) = item.parent_key() {
            if !lookup.exists(&Udi::new(item.kind(), parent)) {
                if options.has(SerializerFlags::FAIL_MISSING_PARENT) {
                    return Ok(SyncAttempt::fail(
                        name,
                        ChangeType::ParentMissing,
                        CoreError::ParentMissing {
                            alias: item.alias().to_string(),
                            parent,
                        }
                        .to_string(),
                    ));
                }
                details.push(SyncChange::warning(
                    format!("{}/Parent", self.mapper.item_type()),
                    "Parent",
                    "parent not found, item placed at the root",
                ));
                item.clear_parent();
            }
        }

        let change = match &existing {
            None => ChangeType::Create,
            Some(old) if self.unchanged(old, &item)? => ChangeType::NoChange,
            Some(_) => ChangeType::Update,
        };

        let save = !options.has(SerializerFlags::DO_NOT_SAVE)
            && (change != ChangeType::NoChange || options.has(SerializerFlags::FORCE));
        if save {
            if let Some(old) = existing.as_ref().filter(|old| old.key() != item.key()) {
                self.service.delete(old.key())?;
            }
            self.service.save(item.clone())?;
        }

        let second_pass = pass == Pass::First && !pending.is_empty();
        if pass == Pass::Second {
            for udi in &pending {
                details.push(SyncChange::warning(
                    self.mapper.item_type(),
                    udi.to_string(),
                    "referenced item not found",
                ));
            }
        }

        let attempt = SyncAttempt::succeed(name, change)
            .with_item(item)
            .with_details(details)
            .with_saved(save)
            .with_second_pass(second_pass);

        if second_pass
            && options.has(SerializerFlags::ONE_PASS)
            && !options.has(SerializerFlags::DO_NOT_SAVE)
        {
            let second = self.deserialize_item(node, options, Pass::Second)?;
            let change = match (change, second.change()) {
                (ChangeType::Create, _) | (_, ChangeType::NoChange) => change,
                (_, later) => later,
            };
            let mut details = attempt.details().to_vec();
            details.extend_from_slice(second.details());
            let saved = attempt.saved() || second.saved();
            return Ok(second
                .with_details(details)
                .with_saved(saved)
                .with_second_pass(false)
                .with_change(change));
        }

        Ok(attempt)
    }
}

impl<M: EntityMapper> SyncSerializer<M::Entity> for XmlSerializer<M> {
    fn item_type(&self) -> &str {
        self.mapper.item_type()
    }

    fn kind(&self) -> EntityKind {
        self.mapper.kind()
    }

    fn serialize(&self, item: &M::Entity) -> SyncAttempt<XElement> {
        match self.mapper.to_xml(item) {
            Ok(node) => SyncAttempt::succeed(item.name(), ChangeType::Export).with_item(node),
            Err(err) => SyncAttempt::fail_with_error(item.name(), ChangeType::Fail, &err),
        }
    }

    fn serialize_empty(&self, item: &M::Entity, action: EmptyAction) -> XElement {
        XElement::empty(action, item.alias(), item.key())
    }

    fn deserialize(&self, node: &XElement, options: &SerializerOptions) -> SyncAttempt<M::Entity> {
        let result = if node.is_empty_item() {
            self.deserialize_empty(node, options)
        } else {
            self.deserialize_item(node, options, Pass::First)
        };
        result.unwrap_or_else(|err| {
            warn!(item = %display_name(node), error = %err, "deserialize failed");
            SyncAttempt::fail_with_error(display_name(node), ChangeType::Fail, &err)
        })
    }

    fn deserialize_second_pass(
        &self,
        node: &XElement,
        options: &SerializerOptions,
    ) -> SyncAttempt<M::Entity> {
        if node.is_empty_item() {
            return SyncAttempt::succeed(display_name(node), ChangeType::NoChange);
        }
        self.deserialize_item(node, options, Pass::Second)
            .unwrap_or_else(|err| {
                warn!(item = %display_name(node), error = %err, "second pass failed");
                SyncAttempt::fail_with_error(display_name(node), ChangeType::Fail, &err)
            })
    }

    fn is_current(&self, node: &XElement, _options: &SerializerOptions) -> ChangeType {
        if node.is_empty_item() {
            return match (node.empty_action(), self.by_key(node)) {
                (Some(EmptyAction::Delete), Ok(Some(_))) => ChangeType::Delete,
                (_, Err(_)) | (None, _) => ChangeType::Fail,
                _ => ChangeType::NoChange,
            };
        }
        let existing = match self.find_existing(node) {
            Ok(Some(existing)) => existing,
            Ok(None) => return ChangeType::Create,
            Err(_) => return ChangeType::Fail,
        };
        match self.mapper.to_xml(&existing) {
            Ok(current) if same_xml(&current, node) => ChangeType::NoChange,
            Ok(_) => ChangeType::Update,
            Err(_) => ChangeType::Fail,
        }
    }

    fn find_item(&self, node: &XElement) -> CoreResult<Option<M::Entity>> {
        self.find_existing(node)
    }
}
