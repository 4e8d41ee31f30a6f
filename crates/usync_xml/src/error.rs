//! Error types for the XML crate.

use thiserror::Error;

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Errors that can occur while reading or writing sync XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// The document could not be parsed.
    #[error("malformed xml at position {position}: {message}")]
    Malformed {
        /// Byte offset where the reader gave up.
        position: u64,
        /// Description of the parse error.
        message: String,
    },

    /// Failed to write the document.
    #[error("writing xml failed: {message}")]
    WriteFailed {
        /// Description of the write error.
        message: String,
    },

    /// The document has no root element.
    #[error("document has no root element")]
    NoRoot,

    /// The document has more than one root element.
    #[error("document has more than one root element")]
    MultipleRoots,

    /// Element or attribute names must be UTF-8.
    #[error("invalid UTF-8 in xml")]
    InvalidUtf8,

    /// The node has no `Key` attribute.
    #[error("node <{element}> has no Key attribute")]
    MissingKey {
        /// Name of the element missing the key.
        element: String,
    },

    /// The `Key` attribute is not a GUID.
    #[error("node <{element}> has an invalid Key: {value}")]
    InvalidKey {
        /// Name of the element.
        element: String,
        /// The value that failed to parse.
        value: String,
    },
}

impl XmlError {
    /// Create a malformed document error.
    pub fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }

    /// Create a write failed error.
    pub fn write_failed(message: impl ToString) -> Self {
        Self::WriteFailed {
            message: message.to_string(),
        }
    }
}
