//! Entity serializers.
//!
//! Each entity kind supplies an [`EntityMapper`] that converts between the
//! typed entity and its canonical XML. [`XmlSerializer`] wraps a mapper with
//! everything that is the same for every kind: tombstones, lookup of the
//! existing item, change detection, parent checks, two pass imports and the
//! [`SerializerFlags`].

pub mod mappers;
mod serializer;
pub(crate) mod xml;

pub use serializer::{SyncSerializer, XmlSerializer};

use crate::entity::{EntityKind, SyncEntity};
use crate::error::CoreResult;
use crate::model::SyncChange;
use crate::services::{EntityLookup, PlannedItems};
use crate::udi::Udi;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use usync_xml::XElement;

bitflags! {
    /// Options that change how a node is deserialized.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SerializerFlags: u32 {
        /// Save even when nothing changed.
        const FORCE = 1;
        /// Compute the result but never persist it.
        const DO_NOT_SAVE = 1 << 1;
        /// Run the second pass straight after the first.
        const ONE_PASS = 1 << 2;
        /// Skip items that already exist.
        const CREATE_ONLY = 1 << 3;
        /// Keep properties and children that are missing from the node.
        const NO_REMOVE = 1 << 4;
        /// Fail tree items whose parent does not exist.
        const FAIL_MISSING_PARENT = 1 << 5;
    }
}

/// Flags plus the handler's free form settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerOptions {
    /// Behaviour flags.
    pub flags: SerializerFlags,
    /// Handler settings bag.
    pub settings: BTreeMap<String, String>,
    /// Items the run is about to import; references to them resolve.
    #[serde(skip)]
    pub planned: Option<Arc<PlannedItems>>,
}

impl SerializerOptions {
    /// Options with the given flags.
    pub fn new(flags: SerializerFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Resolves references against `planned` as well as the host.
    #[must_use]
    pub fn with_planned(mut self, planned: Arc<PlannedItems>) -> Self {
        self.planned = Some(planned);
        self
    }

    /// Adds a setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Returns true if `flag` is set.
    pub fn has(&self, flag: SerializerFlags) -> bool {
        self.flags.contains(flag)
    }

    /// A boolean setting, `default` when absent or unparseable.
    pub fn setting_bool(&self, key: &str, default: bool) -> bool {
        self.settings
            .get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Which import pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// References to items that do not exist yet are deferred.
    First,
    /// Deferred references are resolved.
    Second,
}

/// What a mapper can see while reading a node.
pub struct MapContext<'a> {
    lookup: &'a dyn EntityLookup,
    flags: SerializerFlags,
    pass: Pass,
}

impl<'a> MapContext<'a> {
    /// Creates a context.
    pub fn new(lookup: &'a dyn EntityLookup, flags: SerializerFlags, pass: Pass) -> Self {
        Self { lookup, flags, pass }
    }

    /// Reference lookup.
    pub fn lookup(&self) -> &dyn EntityLookup {
        self.lookup
    }

    /// The current pass.
    pub fn pass(&self) -> Pass {
        self.pass
    }

    /// Returns true when missing children and properties must be kept.
    pub fn no_remove(&self) -> bool {
        self.flags.contains(SerializerFlags::NO_REMOVE)
    }

    /// Returns true if `udi` exists; otherwise records it in `pending`.
    pub fn resolve(&self, udi: Udi, pending: &mut Vec<Udi>) -> bool {
        if self.lookup.exists(&udi) {
            return true;
        }
        if !pending.contains(&udi) {
            pending.push(udi);
        }
        false
    }
}

/// An entity read from XML.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped<E> {
    /// The entity.
    pub item: E,
    /// References that did not resolve.
    pub pending: Vec<Udi>,
    /// Notes about values that could not be applied as written.
    pub details: Vec<SyncChange>,
}

impl<E> Mapped<E> {
    /// A fully resolved entity.
    pub fn new(item: E) -> Self {
        Self {
            item,
            pending: Vec::new(),
            details: Vec::new(),
        }
    }

    /// Adds unresolved references.
    #[must_use]
    pub fn with_pending(mut self, pending: Vec<Udi>) -> Self {
        self.pending = pending;
        self
    }

    /// Adds detail notes.
    #[must_use]
    pub fn with_details(mut self, details: Vec<SyncChange>) -> Self {
        self.details = details;
        self
    }
}

/// Converts one entity kind to and from canonical XML.
pub trait EntityMapper: Send + Sync + 'static {
    /// The entity type.
    type Entity: SyncEntity;

    /// Entity kind handled.
    fn kind(&self) -> EntityKind;

    /// Root element name.
    fn item_type(&self) -> &'static str {
        self.kind().item_type()
    }

    /// Writes the entity. Must be deterministic.
    fn to_xml(&self, item: &Self::Entity) -> CoreResult<XElement>;

    /// Reads an entity, merging with the existing item where needed.
    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&Self::Entity>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Self::Entity>>;
}
