//! Data types (configured property editors).

use super::{EntityKind, SyncEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A configured property editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    /// Stable key.
    pub key: Uuid,
    /// Display name, also used as the alias.
    pub name: String,
    /// Alias of the property editor, e.g. `Umbraco.TextBox`.
    pub editor_alias: String,
    /// Storage type, e.g. `Nvarchar` or `Ntext`.
    pub database_type: String,
    /// Slash separated folder path.
    pub folder: Option<String>,
    /// Editor configuration as a JSON object.
    pub config: Value,
}

impl DataType {
    /// Creates a data type with an empty configuration.
    pub fn new(key: Uuid, name: impl Into<String>, editor_alias: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            editor_alias: editor_alias.into(),
            database_type: "Nvarchar".to_string(),
            folder: None,
            config: Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

impl SyncEntity for DataType {
    fn key(&self) -> Uuid {
        self.key
    }

    fn alias(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::DataType
    }
}
