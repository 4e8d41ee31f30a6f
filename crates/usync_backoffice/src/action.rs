//! Handler level results.

use serde::{Deserialize, Serialize};
use usync_core::{ChangeType, SyncAttempt, SyncChange};
use uuid::Uuid;

/// One result reported by a handler.
///
/// Actions are values: build them with the constructors and `with_*`
/// methods, then collect them. Nothing in the pipeline edits an action once
/// it is in a result list; later passes replace it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAction {
    handler_alias: String,
    success: bool,
    change: ChangeType,
    item_type: String,
    name: String,
    message: Option<String>,
    exception: Option<String>,
    file_name: Option<String>,
    key: Uuid,
    requires_second_pass: bool,
    details: Vec<SyncChange>,
}

impl SyncAction {
    /// A successful action.
    pub fn succeed(
        handler_alias: impl Into<String>,
        item_type: impl Into<String>,
        name: impl Into<String>,
        change: ChangeType,
    ) -> Self {
        Self {
            handler_alias: handler_alias.into(),
            success: true,
            change,
            item_type: item_type.into(),
            name: name.into(),
            message: None,
            exception: None,
            file_name: None,
            key: Uuid::nil(),
            requires_second_pass: false,
            details: Vec::new(),
        }
    }

    /// A failed action.
    pub fn fail(
        handler_alias: impl Into<String>,
        item_type: impl Into<String>,
        name: impl Into<String>,
        change: ChangeType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::succeed(handler_alias, item_type, name, change)
        }
    }

    /// A failed action caused by an error.
    pub fn from_error(
        handler_alias: impl Into<String>,
        item_type: impl Into<String>,
        name: impl Into<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            exception: Some(format!("{error:?}")),
            ..Self::fail(handler_alias, item_type, name, ChangeType::Fail, error.to_string())
        }
    }

    /// Converts a serializer attempt.
    pub fn from_attempt<T>(
        handler_alias: impl Into<String>,
        item_type: impl Into<String>,
        key: Uuid,
        attempt: &SyncAttempt<T>,
    ) -> Self {
        Self {
            handler_alias: handler_alias.into(),
            success: attempt.success(),
            change: attempt.change(),
            item_type: item_type.into(),
            name: attempt.name().to_string(),
            message: attempt.message().map(str::to_string),
            exception: attempt.error().map(str::to_string),
            file_name: None,
            key,
            requires_second_pass: attempt.requires_second_pass(),
            details: attempt.details().to_vec(),
        }
    }

    /// Sets the file the action came from or went to.
    #[must_use]
    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the item key.
    #[must_use]
    pub fn with_key(mut self, key: Uuid) -> Self {
        self.key = key;
        self
    }

    /// Sets the message.
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

    /// Replaces the details.
    #[must_use]
    pub fn with_details(mut self, details: Vec<SyncChange>) -> Self {
        self.details = details;
        self
    }

    /// Handler that produced the action.
    pub fn handler_alias(&self) -> &str {
        &self.handler_alias
    }

    /// Whether the action succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Change type.
    pub fn change(&self) -> ChangeType {
        self.change
    }

    /// Item type name.
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// Item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error text, when the action failed with an error.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    /// File name.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Item key, nil when there is no single item.
    pub fn key(&self) -> Uuid {
        self.key
    }

    /// Whether the item needs the second pass.
    pub fn requires_second_pass(&self) -> bool {
        self.requires_second_pass
    }

    /// Property level changes.
    pub fn details(&self) -> &[SyncChange] {
        &self.details
    }

    /// Returns true for failed actions and failure change types.
    pub fn is_failure(&self) -> bool {
        !self.success || self.change.is_failure()
    }
}

/// Replaces actions in `actions` that have the same handler and key as one
/// in `updates`; updates with no match are appended.
pub fn replace_actions(actions: &mut Vec<SyncAction>, updates: Vec<SyncAction>) {
    for update in updates {
        let existing = actions.iter_mut().find(|a| {
            !a.key.is_nil() && a.key == update.key && a.handler_alias == update.handler_alias
        });
        match existing {
            Some(slot) => *slot = update,
            None => actions.push(update),
        }
    }
}

/// Cuts a result list down for display.
///
/// Non strict summaries keep every change and every failure. Strict
/// summaries collapse each handler's successful actions into one line.
/// Failures are always listed individually.
pub fn summarise_actions(actions: &[SyncAction], strict: bool) -> Vec<SyncAction> {
    if !strict {
        return actions
            .iter()
            .filter(|a| a.is_failure() || a.change.is_change())
            .cloned()
            .collect();
    }

    let mut handlers: Vec<&str> = Vec::new();
    for action in actions {
        if !handlers.contains(&action.handler_alias()) {
            handlers.push(action.handler_alias());
        }
    }

    let mut summary = Vec::new();
    for handler in handlers {
        let own: Vec<&SyncAction> = actions.iter().filter(|a| a.handler_alias() == handler).collect();
        let (failed, passed): (Vec<&SyncAction>, Vec<&SyncAction>) =
            own.into_iter().partition(|a| a.is_failure());

        if !passed.is_empty() {
            let changed = passed.iter().filter(|a| a.change.is_change()).count();
            let change = if changed > 0 { ChangeType::Update } else { ChangeType::NoChange };
            let item_type = passed[0].item_type();
            summary.push(
                SyncAction::succeed(handler, item_type, format!("{} items", passed.len()), change)
                    .with_message(format!("{changed} changes")),
            );
        }
        summary.extend(failed.into_iter().cloned());
    }
    summary
}
