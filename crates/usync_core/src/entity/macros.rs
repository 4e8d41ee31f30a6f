//! Macros.

use super::{EntityKind, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A macro parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroParameter {
    /// Parameter alias.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Position.
    pub sort_order: i32,
    /// Parameter editor alias.
    pub editor_alias: String,
}

/// A macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    /// Stable key.
    pub key: Uuid,
    /// Alias.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Partial view path.
    pub source: String,
    /// Available in the rich text editor.
    pub use_in_editor: bool,
    /// Render inside the editor.
    pub render_in_editor: bool,
    /// Cache duration in seconds.
    pub cache_duration: i32,
    /// Cache per page.
    pub cache_by_page: bool,
    /// Cache per member.
    pub cache_by_member: bool,
    /// Parameters.
    pub parameters: Vec<MacroParameter>,
}

impl Macro {
    /// Creates a macro with no parameters.
    pub fn new(key: Uuid, alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key,
            alias: alias.into(),
            name: name.into(),
            source: String::new(),
            use_in_editor: false,
            render_in_editor: false,
            cache_duration: 0,
            cache_by_page: false,
            cache_by_member: false,
            parameters: Vec::new(),
        }
    }
}

impl SyncEntity for Macro {
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
        EntityKind::Macro
    }
}
