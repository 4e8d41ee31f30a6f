//! Languages.

use super::{EntityKind, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    /// Stable key.
    pub key: Uuid,
    /// ISO code, used as the alias.
    pub iso_code: String,
    /// Culture display name.
    pub name: String,
    /// The default language.
    pub is_default: bool,
    /// Content must be translated before publishing.
    pub is_mandatory: bool,
    /// ISO code of the fallback language.
    pub fallback: Option<String>,
}

impl Language {
    /// Creates a language.
    pub fn new(key: Uuid, iso_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key,
            iso_code: iso_code.into(),
            name: name.into(),
            is_default: false,
            is_mandatory: false,
            fallback: None,
        }
    }
}

impl SyncEntity for Language {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.iso_code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Language
    }
}
