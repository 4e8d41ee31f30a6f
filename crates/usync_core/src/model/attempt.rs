//! Result of a single serializer operation.

use crate::model::change::{ChangeType, SyncChange};

/// The outcome of serializing or deserializing one item.
///
/// Attempts are immutable once built; construct them with [`SyncAttempt::succeed`],
/// [`SyncAttempt::fail`] or [`SyncAttempt::succeed_if`] and chain the `with_*`
/// methods.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncAttempt<T> {
    success: bool,
    name: String,
    item: Option<T>,
    change: ChangeType,
    message: Option<String>,
    error: Option<String>,
    details: Vec<SyncChange>,
    saved: bool,
    requires_second_pass: bool,
}

impl<T> SyncAttempt<T> {
    /// A successful attempt.
    pub fn succeed(name: impl Into<String>, change: ChangeType) -> Self {
        Self {
            success: true,
            name: name.into(),
            item: None,
            change,
            message: None,
            error: None,
            details: Vec::new(),
            saved: false,
            requires_second_pass: false,
        }
    }

    /// A failed attempt.
    pub fn fail(name: impl Into<String>, change: ChangeType, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: None,
            message: Some(message.into()),
            ..Self::succeed(name, change)
        }
    }

    /// A failed attempt caused by an error.
    pub fn fail_with_error(
        name: impl Into<String>,
        change: ChangeType,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
            error: Some(format!("{error:?}")),
            ..Self::succeed(name, change)
        }
    }

    /// Succeeds with the given item when `condition` holds, fails otherwise.
    pub fn succeed_if(condition: bool, name: impl Into<String>, item: T, change: ChangeType) -> Self {
        if condition {
            Self::succeed(name, change).with_item(item)
        } else {
            Self::fail(name, ChangeType::Fail, "condition not met")
        }
    }

    /// Attaches the item.
    #[must_use]
    pub fn with_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Replaces the change type.
    #[must_use]
    pub fn with_change(mut self, change: ChangeType) -> Self {
        self.change = change;
        self
    }

    /// Attaches change details.
    #[must_use]
    pub fn with_details(mut self, details: Vec<SyncChange>) -> Self {
        self.details = details;
        self
    }

    /// Records that the item has already been saved.
    #[must_use]
    pub fn with_saved(mut self, saved: bool) -> Self {
        self.saved = saved;
        self
    }

    /// Records that references could not be resolved yet.
    #[must_use]
    pub fn with_second_pass(mut self, required: bool) -> Self {
        self.requires_second_pass = required;
        self
    }

    /// Whether the operation succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item, if one was produced.
    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    /// Consumes the attempt, returning the item.
    pub fn into_item(self) -> Option<T> {
        self.item
    }

    /// The change type.
    pub fn change(&self) -> ChangeType {
        self.change
    }

    /// Message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error debug text, if the attempt failed with an error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Property level changes.
    pub fn details(&self) -> &[SyncChange] {
        &self.details
    }

    /// Whether the item was already persisted.
    pub fn saved(&self) -> bool {
        self.saved
    }

    /// Whether a second pass is needed.
    pub fn requires_second_pass(&self) -> bool {
        self.requires_second_pass
    }

    /// Maps the item, keeping everything else.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SyncAttempt<U> {
        SyncAttempt {
            success: self.success,
            name: self.name,
            item: self.item.map(f),
            change: self.change,
            message: self.message,
            error: self.error,
            details: self.details,
            saved: self.saved,
            requires_second_pass: self.requires_second_pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn succeed_builder() {
        let attempt = SyncAttempt::succeed("home", ChangeType::Create)
            .with_item(5)
            .with_saved(true)
            .with_message("created");
        assert!(attempt.success());
        assert_eq!(attempt.item(), Some(&5));
        assert!(attempt.saved());
        assert_eq!(attempt.message(), Some("created"));
    }

    #[test]
    fn fail_with_error_keeps_message() {
        let err = CoreError::invalid_node("missing key");
        let attempt: SyncAttempt<()> = SyncAttempt::fail_with_error("x", ChangeType::Fail, &err);
        assert!(!attempt.success());
        assert_eq!(attempt.message(), Some("invalid node: missing key"));
        assert!(attempt.error().is_some());
    }

    #[test]
    fn succeed_if_branches() {
        assert!(SyncAttempt::succeed_if(true, "a", 1, ChangeType::Update).success());
        let failed = SyncAttempt::succeed_if(false, "a", 1, ChangeType::Update);
        assert!(!failed.success());
        assert_eq!(failed.change(), ChangeType::Fail);
        assert!(failed.item().is_none());
    }

    #[test]
    fn map_keeps_metadata() {
        let attempt = SyncAttempt::succeed("a", ChangeType::Update)
            .with_item(2)
            .with_second_pass(true)
            .map(|n| n * 10);
        assert_eq!(attempt.item(), Some(&20));
        assert!(attempt.requires_second_pass());
    }
}
