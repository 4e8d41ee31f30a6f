//! Error types for uSync core.

use crate::udi::Udi;
use thiserror::Error;
use uuid::Uuid;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in uSync core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// XML could not be read or written.
    #[error("xml error: {0}")]
    Xml(#[from] usync_xml::XmlError),

    /// JSON configuration could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The node does not describe a valid item.
    #[error("invalid node: {message}")]
    InvalidNode {
        /// Description of the problem.
        message: String,
    },

    /// The node is for a different item type than the serializer handles.
    #[error("expected <{expected}> but found <{found}>")]
    WrongItemType {
        /// Item type the serializer handles.
        expected: String,
        /// Root element of the node.
        found: String,
    },

    /// A referenced item does not exist.
    #[error("missing reference: {udi}")]
    MissingReference {
        /// The item that could not be found.
        udi: Udi,
    },

    /// An item referenced by alias does not exist.
    #[error("{item_type} '{alias}' not found")]
    UnknownAlias {
        /// Item type of the reference.
        item_type: String,
        /// The alias that could not be resolved.
        alias: String,
    },

    /// The parent of a tree item does not exist.
    #[error("parent {parent} missing for {alias}")]
    ParentMissing {
        /// Alias of the item being imported.
        alias: String,
        /// Key of the missing parent.
        parent: Uuid,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle between: {}", members.join(", "))]
    DependencyCycle {
        /// Items that could not be ordered.
        members: Vec<String>,
    },

    /// A UDI string could not be parsed.
    #[error("invalid udi: {0}")]
    InvalidUdi(String),

    /// A property editor configuration is not in an expected shape.
    #[error("invalid configuration for {editor}: {message}")]
    InvalidConfig {
        /// Property editor alias.
        editor: String,
        /// Description of the problem.
        message: String,
    },

    /// The host service rejected an operation.
    #[error("service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Create an invalid node error.
    pub fn invalid_node(message: impl Into<String>) -> Self {
        Self::InvalidNode {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(editor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            editor: editor.into(),
            message: message.into(),
        }
    }

    /// Create a service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by malformed input.
    ///
    /// These are never retried.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            CoreError::Xml(_)
                | CoreError::Json(_)
                | CoreError::InvalidNode { .. }
                | CoreError::WrongItemType { .. }
                | CoreError::InvalidUdi(_)
        )
    }
}
