//! Typed CMS entities that can be synced.
//!
//! These mirror what the host CMS stores, reduced to the fields that take
//! part in the sync file format. The host itself stays behind the
//! [`EntityService`](crate::services::EntityService) trait.

mod content;
mod content_type;
mod data_type;
mod dictionary;
mod domain;
mod language;
mod macros;
mod relation;
mod template;

pub use content::{Content, ContentKind, PropertyValue};
pub use content_type::{ContentType, ContentTypeKind, PropertyTab, PropertyType};
pub use data_type::DataType;
pub use dictionary::{DictionaryItem, Translation};
pub use domain::Domain;
pub use language::Language;
pub use macros::{Macro, MacroParameter};
pub use relation::{Relation, RelationType};
pub use template::Template;

use crate::dependency::orders;
use crate::udi::Udi;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// The kinds of entity the sync engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Property editor configuration.
    DataType,
    /// Document type.
    DocumentType,
    /// Media type.
    MediaType,
    /// Member type.
    MemberType,
    /// Razor template.
    Template,
    /// Content node.
    Document,
    /// Media node.
    Media,
    /// Dictionary item.
    DictionaryItem,
    /// Language.
    Language,
    /// Hostname bound to a content root.
    Domain,
    /// Macro.
    Macro,
    /// Relation type with its relations.
    RelationType,
}

impl EntityKind {
    /// All kinds in dependency order.
    pub const ALL: [EntityKind; 12] = [
        EntityKind::Language,
        EntityKind::DictionaryItem,
        EntityKind::DataType,
        EntityKind::DocumentType,
        EntityKind::MediaType,
        EntityKind::MemberType,
        EntityKind::Template,
        EntityKind::Macro,
        EntityKind::Document,
        EntityKind::Media,
        EntityKind::Domain,
        EntityKind::RelationType,
    ];

    /// Entity type segment used in UDIs.
    pub fn udi_type(&self) -> &'static str {
        match self {
            EntityKind::DataType => "data-type",
            EntityKind::DocumentType => "document-type",
            EntityKind::MediaType => "media-type",
            EntityKind::MemberType => "member-type",
            EntityKind::Template => "template",
            EntityKind::Document => "document",
            EntityKind::Media => "media",
            EntityKind::DictionaryItem => "dictionary-item",
            EntityKind::Language => "language",
            EntityKind::Domain => "domain",
            EntityKind::Macro => "macro",
            EntityKind::RelationType => "relation-type",
        }
    }

    /// Parses a UDI entity type segment.
    pub fn from_udi_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.udi_type() == value)
    }

    /// Root element name of the canonical XML for this kind.
    pub fn item_type(&self) -> &'static str {
        match self {
            EntityKind::DataType => "DataType",
            EntityKind::DocumentType => "ContentType",
            EntityKind::MediaType => "MediaType",
            EntityKind::MemberType => "MemberType",
            EntityKind::Template => "Template",
            EntityKind::Document => "Content",
            EntityKind::Media => "Media",
            EntityKind::DictionaryItem => "Dictionary",
            EntityKind::Language => "Language",
            EntityKind::Domain => "Domain",
            EntityKind::Macro => "Macro",
            EntityKind::RelationType => "RelationType",
        }
    }

    /// Finds the kind for a root element name.
    pub fn from_item_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.item_type() == value)
    }

    /// Processing order band. Lower numbers are processed first.
    pub fn order(&self) -> i32 {
        match self {
            EntityKind::Language => orders::LANGUAGES,
            EntityKind::DictionaryItem => orders::DICTIONARY,
            EntityKind::DataType => orders::DATA_TYPES,
            EntityKind::DocumentType => orders::CONTENT_TYPES,
            EntityKind::MediaType => orders::MEDIA_TYPES,
            EntityKind::MemberType => orders::MEMBER_TYPES,
            EntityKind::Template => orders::TEMPLATES,
            EntityKind::Macro => orders::MACROS,
            EntityKind::Media => orders::MEDIA,
            EntityKind::Document => orders::CONTENT,
            EntityKind::Domain => orders::DOMAINS,
            EntityKind::RelationType => orders::RELATION_TYPES,
        }
    }

    /// Returns true for kinds stored as a tree of parents and children.
    pub fn is_tree(&self) -> bool {
        matches!(
            self,
            EntityKind::DocumentType
                | EntityKind::MediaType
                | EntityKind::MemberType
                | EntityKind::Template
                | EntityKind::Document
                | EntityKind::Media
                | EntityKind::DictionaryItem
        )
    }
}

/// A key plus alias reference to another item, as written in sync files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Key of the referenced item.
    pub key: Uuid,
    /// Alias of the referenced item at export time.
    pub alias: String,
}

impl ItemRef {
    /// Creates a reference.
    pub fn new(key: Uuid, alias: impl Into<String>) -> Self {
        Self {
            key,
            alias: alias.into(),
        }
    }
}

/// Behaviour shared by every syncable entity.
pub trait SyncEntity: Clone + Debug + Send + Sync + 'static {
    /// Stable key.
    fn key(&self) -> Uuid;

    /// Alias (or the closest thing the entity has to one).
    fn alias(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str {
        self.alias()
    }

    /// Entity kind.
    fn kind(&self) -> EntityKind;

    /// Depth in the tree; one for root items.
    fn level(&self) -> i32 {
        1
    }

    /// Key of the parent item, for tree entities.
    fn parent_key(&self) -> Option<Uuid> {
        None
    }

    /// Moves the item to the root of its tree.
    fn clear_parent(&mut self) {}

    /// The item's UDI.
    fn udi(&self) -> Udi {
        Udi::new(self.kind(), self.key())
    }
}
