//! Domains.

use super::{EntityKind, ItemRef, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hostname bound to a content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Stable key.
    pub key: Uuid,
    /// Host name, used as the alias.
    pub name: String,
    /// Wildcard (culture only) domain.
    pub is_wildcard: bool,
    /// ISO code of the language served.
    pub language: Option<String>,
    /// Content node the domain is bound to.
    pub root: Option<ItemRef>,
    /// Position among the node's domains.
    pub sort_order: i32,
}

impl Domain {
    /// Creates a domain.
    pub fn new(key: Uuid, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            is_wildcard: false,
            language: None,
            root: None,
            sort_order: 0,
        }
    }
}

impl SyncEntity for Domain {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Domain
    }
}
