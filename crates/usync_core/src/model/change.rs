//! Property level change details.

use serde::{Deserialize, Serialize};

/// Display value used in place of blank old or new values.
pub const BLANK: &str = "(Blank)";

/// The outcome of an operation on a whole item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChangeType {
    /// Nothing changed.
    #[default]
    NoChange,
    /// A new item was created.
    Create,
    /// The item was imported.
    Import,
    /// The item was exported.
    Export,
    /// An existing item was updated.
    Update,
    /// The item was deleted.
    Delete,
    /// A report found the item would change on import.
    WillChange,
    /// Informational result, not a change.
    Information,
    /// The change was rolled back.
    Rolledback,
    /// The operation failed.
    Fail,
    /// The import of this item failed.
    ImportFail,
    /// The file does not match the current format or item.
    Mismatch,
    /// The item's parent does not exist.
    ParentMissing,
    /// The item is hidden from reports.
    Hidden,
    /// The item was removed during a clean.
    Clean,
    /// The item was removed because its file was a tombstone.
    Removed,
}

impl ChangeType {
    /// Returns true for the failure variants.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ChangeType::Fail | ChangeType::ImportFail | ChangeType::Mismatch | ChangeType::ParentMissing
        )
    }

    /// Returns true if the item was or would be modified.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            ChangeType::NoChange | ChangeType::Information | ChangeType::Hidden
        ) && !self.is_failure()
    }
}

/// The kind of a single property level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeDetailType {
    /// Value is the same.
    NoChange,
    /// Value is new.
    Create,
    /// Value changed.
    Update,
    /// Value was removed.
    Delete,
    /// The value could not be applied.
    Error,
    /// The value was applied with a caveat.
    Warning,
}

/// One property level difference between two versions of an item.
///
/// Paths are slash delimited pointers into the canonical document, e.g.
/// `ContentType/GenericProperties/title/Name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChange {
    success: bool,
    name: String,
    path: String,
    old_value: String,
    new_value: String,
    change: ChangeDetailType,
}

fn display(value: &str) -> String {
    if value.trim().is_empty() {
        BLANK.to_string()
    } else {
        value.to_string()
    }
}

impl SyncChange {
    fn build(
        change: ChangeDetailType,
        path: impl Into<String>,
        name: impl Into<String>,
        old_value: &str,
        new_value: &str,
        success: bool,
    ) -> Self {
        Self {
            success,
            name: name.into(),
            path: path.into(),
            old_value: display(old_value),
            new_value: display(new_value),
            change,
        }
    }

    /// A value that did not exist before.
    pub fn create(path: impl Into<String>, name: impl Into<String>, new_value: &str) -> Self {
        Self::build(ChangeDetailType::Create, path, name, "", new_value, true)
    }

    /// A value that changed.
    pub fn update(
        path: impl Into<String>,
        name: impl Into<String>,
        old_value: &str,
        new_value: &str,
    ) -> Self {
        Self::build(ChangeDetailType::Update, path, name, old_value, new_value, true)
    }

    /// A value that was removed.
    pub fn delete(path: impl Into<String>, name: impl Into<String>, old_value: &str) -> Self {
        Self::build(ChangeDetailType::Delete, path, name, old_value, "", true)
    }

    /// A value that is unchanged.
    pub fn no_change(path: impl Into<String>, name: impl Into<String>, value: &str) -> Self {
        Self::build(ChangeDetailType::NoChange, path, name, value, value, true)
    }

    /// A value that could not be applied.
    pub fn error(path: impl Into<String>, name: impl Into<String>, message: &str) -> Self {
        Self::build(ChangeDetailType::Error, path, name, "", message, false)
    }

    /// A value applied with a caveat.
    pub fn warning(path: impl Into<String>, name: impl Into<String>, message: &str) -> Self {
        Self::build(ChangeDetailType::Warning, path, name, "", message, true)
    }

    /// Whether the change was applied.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Display name of the changed value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the value inside the document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Previous value, or [`BLANK`].
    pub fn old_value(&self) -> &str {
        &self.old_value
    }

    /// New value, or [`BLANK`].
    pub fn new_value(&self) -> &str {
        &self.new_value
    }

    /// The kind of change.
    pub fn change(&self) -> ChangeDetailType {
        self.change
    }
}
