//! Relation types.

use super::{EntityKind, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A relation between two items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Key of the parent item.
    pub parent: Uuid,
    /// Key of the child item.
    pub child: Uuid,
    /// Comment.
    pub comment: String,
}

/// A relation type and the relations it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    /// Stable key.
    pub key: Uuid,
    /// Alias.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Relations go both ways.
    pub is_bidirectional: bool,
    /// The child depends on the parent.
    pub is_dependency: bool,
    /// Object type of parents.
    pub parent_type: Option<String>,
    /// Object type of children.
    pub child_type: Option<String>,
    /// The relations.
    pub relations: Vec<Relation>,
}

impl RelationType {
    /// Creates a relation type with no relations.
    pub fn new(key: Uuid, alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key,
            alias: alias.into(),
            name: name.into(),
            is_bidirectional: false,
            is_dependency: false,
            parent_type: None,
            child_type: None,
            relations: Vec::new(),
        }
    }
}

impl SyncEntity for RelationType {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::RelationType
    }
}
