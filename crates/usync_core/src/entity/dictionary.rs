//! Dictionary items.

use super::{EntityKind, ItemRef, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A translated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// ISO code of the language.
    pub language: String,
    /// Translated text.
    pub value: String,
}

/// A dictionary item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryItem {
    /// Stable key.
    pub key: Uuid,
    /// Item key (used as the alias).
    pub item_key: String,
    /// Depth in the dictionary tree.
    pub level: i32,
    /// Parent item.
    pub parent: Option<ItemRef>,
    /// Translations, one per language.
    pub translations: Vec<Translation>,
}

impl DictionaryItem {
    /// Creates a root dictionary item.
    pub fn new(key: Uuid, item_key: impl Into<String>) -> Self {
        Self {
            key,
            item_key: item_key.into(),
            level: 1,
            parent: None,
            translations: Vec::new(),
        }
    }
}

impl SyncEntity for DictionaryItem {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.item_key
    }

    fn kind(&self) -> EntityKind {
        EntityKind::DictionaryItem
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
