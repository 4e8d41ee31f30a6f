//! Error types for the back office pipeline.

use thiserror::Error;

/// Result type for back office operations.
pub type BackOfficeResult<T> = Result<T, BackOfficeError>;

/// Errors raised outside the per-item import path.
///
/// Item failures never surface here; they become failed actions.
#[derive(Error, Debug)]
pub enum BackOfficeError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the core engine.
    #[error(transparent)]
    Core(#[from] usync_core::CoreError),

    /// A sync file could not be read.
    #[error("xml error: {0}")]
    Xml(#[from] usync_xml::XmlError),

    /// A settings file could not be read.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// No handler with this alias is registered.
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    /// A handler with this alias is already registered.
    #[error("handler already registered: {0}")]
    DuplicateHandler(String),

    /// The handler set does not exist.
    #[error("handler set not found: {0}")]
    SetNotFound(String),

    /// A stepwise request id with no open run.
    #[error("no open run for request {0}")]
    RequestNotFound(uuid::Uuid),

    /// The item does not exist in the host.
    #[error("{item_type} {key} not found")]
    ItemNotFound {
        /// Item type.
        item_type: String,
        /// Key looked up.
        key: uuid::Uuid,
    },
}

impl BackOfficeError {
    /// Creates an item not found error.
    pub fn item_not_found(item_type: impl Into<String>, key: uuid::Uuid) -> Self {
        Self::ItemNotFound {
            item_type: item_type.into(),
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BackOfficeError::HandlerNotFound("contentHandler".into());
        assert_eq!(err.to_string(), "handler not found: contentHandler");

        let err = BackOfficeError::item_not_found("Content", uuid::Uuid::nil());
        assert!(err.to_string().starts_with("Content 00000000"));
    }

    #[test]
    fn core_errors_convert() {
        let err: BackOfficeError = usync_core::CoreError::invalid_node("bad").into();
        assert_eq!(err.to_string(), "invalid node: bad");
    }
}
