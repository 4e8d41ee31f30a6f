//! Content and media nodes.

use super::{EntityKind, ItemRef, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which tree a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Content tree.
    Document,
    /// Media tree.
    Media,
}

impl ContentKind {
    /// The matching entity kind.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ContentKind::Document => EntityKind::Document,
            ContentKind::Media => EntityKind::Media,
        }
    }

    /// The entity kind of this node's type.
    pub fn type_kind(&self) -> EntityKind {
        match self {
            ContentKind::Document => EntityKind::DocumentType,
            ContentKind::Media => EntityKind::MediaType,
        }
    }
}

/// A stored property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// Property alias.
    pub alias: String,
    /// Culture for variant values.
    pub culture: Option<String>,
    /// Segment for segmented values.
    pub segment: Option<String>,
    /// Raw stored value.
    pub value: String,
}

impl PropertyValue {
    /// Creates an invariant value.
    pub fn new(alias: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            culture: None,
            segment: None,
            value: value.into(),
        }
    }
}

/// A content or media node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Which tree the node lives in.
    pub kind: ContentKind,
    /// Stable key.
    pub key: Uuid,
    /// Node name.
    pub name: String,
    /// Depth in the tree.
    pub level: i32,
    /// Parent node.
    pub parent: Option<ItemRef>,
    /// Position among siblings.
    pub sort_order: i32,
    /// Alias of the content or media type.
    pub content_type: String,
    /// Alias of the template, for documents.
    pub template: Option<ItemRef>,
    /// Published state, for documents.
    pub published: bool,
    /// In the recycle bin.
    pub trashed: bool,
    /// Property values.
    pub properties: Vec<PropertyValue>,
}

impl Content {
    /// Creates a root node of the given type.
    pub fn new(kind: ContentKind, key: Uuid, name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            kind,
            key,
            name: name.into(),
            level: 1,
            parent: None,
            sort_order: 0,
            content_type: content_type.into(),
            template: None,
            published: false,
            trashed: false,
            properties: Vec::new(),
        }
    }

    /// Places the node under a parent.
    #[must_use]
    pub fn under(mut self, parent: &Content) -> Self {
        self.parent = Some(ItemRef::new(parent.key, parent.name.clone()));
        self.level = parent.level + 1;
        self
    }
}

impl SyncEntity for Content {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        self.kind.entity_kind()
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn parent_key(&self) -> Option<Uuid> {
        self.parent.as_ref().map(|p| p.key)
    }

    fn clear_parent(&mut self) {
        self.parent = None;
        self.level = 1;
    }
}
