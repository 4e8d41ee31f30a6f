//! Templates.

use super::{EntityKind, ItemRef, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A view template, optionally nested under a master template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Stable key.
    pub key: Uuid,
    /// Alias.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Depth in the template tree.
    pub level: i32,
    /// Master template.
    pub master: Option<ItemRef>,
    /// View source, when content is synced with the template.
    pub contents: Option<String>,
}

impl Template {
    /// Creates a root template.
    pub fn new(key: Uuid, alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key,
            alias: alias.into(),
            name: name.into(),
            level: 1,
            master: None,
            contents: None,
        }
    }
}

impl SyncEntity for Template {
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
        EntityKind::Template
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn parent_key(&self) -> Option<Uuid> {
        self.master.as_ref().map(|m| m.key)
    }

    fn clear_parent(&mut self) {
        self.master = None;
        self.level = 1;
    }
}
