//! Document, media and member types.

use super::{EntityKind, ItemRef, SyncEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which tree a content type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentTypeKind {
    /// Document type.
    Document,
    /// Media type.
    Media,
    /// Member type.
    Member,
}

impl ContentTypeKind {
    /// The matching entity kind.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ContentTypeKind::Document => EntityKind::DocumentType,
            ContentTypeKind::Media => EntityKind::MediaType,
            ContentTypeKind::Member => EntityKind::MemberType,
        }
    }
}

/// A property on a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyType {
    /// Stable key.
    pub key: Uuid,
    /// Property alias.
    pub alias: String,
    /// Display name; `#` prefixed names are dictionary keys.
    pub name: String,
    /// Key of the data type used to edit the property.
    pub data_type: Uuid,
    /// Alias of the property editor, informational.
    pub editor_alias: String,
    /// Alias of the tab or group holding the property.
    pub tab: Option<String>,
    /// Whether a value is required.
    pub mandatory: bool,
    /// Validation regex.
    pub validation: Option<String>,
    /// Help text.
    pub description: Option<String>,
    /// Position in the tab.
    pub sort_order: i32,
    /// Culture and segment variation setting.
    pub variations: String,
    /// Show the label above the editor.
    pub label_on_top: bool,
}

impl PropertyType {
    /// Creates a property using the given data type.
    pub fn new(key: Uuid, alias: impl Into<String>, name: impl Into<String>, data_type: Uuid) -> Self {
        Self {
            key,
            alias: alias.into(),
            name: name.into(),
            data_type,
            editor_alias: String::new(),
            tab: None,
            mandatory: false,
            validation: None,
            description: None,
            sort_order: 0,
            variations: "Nothing".to_string(),
            label_on_top: false,
        }
    }
}

/// A tab or group on a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTab {
    /// Stable key.
    pub key: Uuid,
    /// Tab alias.
    pub alias: String,
    /// Caption; `#` prefixed captions are dictionary keys.
    pub caption: String,
    /// `Group` or `Tab`.
    pub tab_type: String,
    /// Display position.
    pub sort_order: i32,
}

/// A document, media or member type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    /// Which tree this type lives in.
    pub kind: ContentTypeKind,
    /// Stable key.
    pub key: Uuid,
    /// Alias.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Icon class.
    pub icon: String,
    /// Description.
    pub description: Option<String>,
    /// Can be created at the root of the tree.
    pub allow_at_root: bool,
    /// Element types hold block content only.
    pub is_element: bool,
    /// Culture variation setting.
    pub variations: String,
    /// Depth in the type tree.
    pub level: i32,
    /// Parent (master) type.
    pub parent: Option<ItemRef>,
    /// Folder path.
    pub folder: Option<String>,
    /// Types composed into this one.
    pub compositions: Vec<ItemRef>,
    /// Alias of the default template.
    pub default_template: Option<String>,
    /// Templates content of this type may use.
    pub allowed_templates: Vec<ItemRef>,
    /// Types allowed as children.
    pub structure: Vec<ItemRef>,
    /// Properties.
    pub properties: Vec<PropertyType>,
    /// Tabs and groups.
    pub tabs: Vec<PropertyTab>,
}

impl ContentType {
    /// Creates an empty content type at the root.
    pub fn new(kind: ContentTypeKind, key: Uuid, alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            key,
            alias: alias.into(),
            name: name.into(),
            icon: "icon-document".to_string(),
            description: None,
            allow_at_root: false,
            is_element: false,
            variations: "Nothing".to_string(),
            level: 1,
            parent: None,
            folder: None,
            compositions: Vec::new(),
            default_template: None,
            allowed_templates: Vec::new(),
            structure: Vec::new(),
            properties: Vec::new(),
            tabs: Vec::new(),
        }
    }
}

impl SyncEntity for ContentType {
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
