//! Settings for sync runs.
//!
//! Settings are read once (from JSON or built in code) and passed by
//! reference through a run; nothing in the pipeline changes them.
//!
//! ```json
//! {
//!   "rootFolder": "uSync/v9/",
//!   "defaultSet": "Default",
//!   "handlerSets": {
//!     "Default": {
//!       "handlerDefaults": { "useFlatStructure": true },
//!       "handlers": { "contentHandler": { "settings": { "IncludeChildren": "true" } } }
//!     }
//!   }
//! }
//! ```

use crate::error::{BackOfficeError, BackOfficeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Operations a handler can be enabled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerAction {
    /// Every action.
    All,
    /// Import from disk.
    Import,
    /// Export to disk.
    Export,
    /// Report what an import would do.
    Report,
    /// Export when an item is saved in the host.
    Save,
}

fn default_actions() -> Vec<HandlerAction> {
    vec![HandlerAction::All]
}

/// Settings for one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerSettings {
    /// Whether the handler runs at all.
    pub enabled: bool,
    /// Actions the handler runs for.
    pub actions: Vec<HandlerAction>,
    /// Write every file directly in the handler folder.
    pub use_flat_structure: bool,
    /// Name files by key instead of alias.
    pub guid_names: bool,
    /// Fail items whose parent is missing instead of importing at the root.
    pub fail_on_missing_parent: bool,
    /// Overrides the handler's own group.
    pub group: Option<String>,
    /// Write clean markers on export.
    pub create_clean: bool,
    /// Free form settings passed to the serializer.
    pub settings: BTreeMap<String, String>,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            actions: default_actions(),
            use_flat_structure: true,
            guid_names: false,
            fail_on_missing_parent: false,
            group: None,
            create_clean: false,
            settings: BTreeMap::new(),
        }
    }
}

impl HandlerSettings {
    /// Returns true if the handler should run for `action`.
    pub fn allows(&self, action: HandlerAction) -> bool {
        self.enabled
            && self
                .actions
                .iter()
                .any(|a| *a == HandlerAction::All || *a == action)
    }

    /// Applies a handler specific override on top of these settings.
    pub fn overlay(&self, overrides: &HandlerOverrides) -> HandlerSettings {
        let mut settings = self.settings.clone();
        settings.extend(overrides.settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        HandlerSettings {
            enabled: overrides.enabled.unwrap_or(self.enabled),
            actions: overrides.actions.clone().unwrap_or_else(|| self.actions.clone()),
            use_flat_structure: overrides.use_flat_structure.unwrap_or(self.use_flat_structure),
            guid_names: overrides.guid_names.unwrap_or(self.guid_names),
            fail_on_missing_parent: overrides
                .fail_on_missing_parent
                .unwrap_or(self.fail_on_missing_parent),
            group: overrides.group.clone().or_else(|| self.group.clone()),
            create_clean: overrides.create_clean.unwrap_or(self.create_clean),
            settings,
        }
    }

    /// Sets the actions.
    pub fn with_actions(mut self, actions: Vec<HandlerAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Uses nested folders.
    pub fn with_nested_structure(mut self) -> Self {
        self.use_flat_structure = false;
        self
    }

    /// Names files by key.
    pub fn with_guid_names(mut self) -> Self {
        self.guid_names = true;
        self
    }

    /// Writes clean markers on export.
    pub fn with_create_clean(mut self) -> Self {
        self.create_clean = true;
        self
    }

    /// Adds a free form setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// A boolean free form setting.
    pub fn setting_bool(&self, key: &str, default: bool) -> bool {
        self.settings
            .get(key)
            .and_then(|v| v.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or(default)
    }
}

/// Per handler values that replace the set defaults when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerOverrides {
    /// Enabled.
    pub enabled: Option<bool>,
    /// Actions.
    pub actions: Option<Vec<HandlerAction>>,
    /// Flat structure.
    pub use_flat_structure: Option<bool>,
    /// Guid names.
    pub guid_names: Option<bool>,
    /// Fail on missing parent.
    pub fail_on_missing_parent: Option<bool>,
    /// Group.
    pub group: Option<String>,
    /// Create clean markers.
    pub create_clean: Option<bool>,
    /// Settings merged over the defaults' settings.
    pub settings: BTreeMap<String, String>,
}

/// A named bundle of handler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerSetSettings {
    /// Whether the set can be used.
    pub enabled: bool,
    /// Groups included in the set; empty means every group.
    pub handler_groups: Vec<String>,
    /// Handler aliases left out of the set.
    pub disabled_handlers: Vec<String>,
    /// Settings every handler starts from.
    pub handler_defaults: HandlerSettings,
    /// Per handler overrides keyed by alias.
    pub handlers: BTreeMap<String, HandlerOverrides>,
}

impl Default for HandlerSetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            handler_groups: Vec::new(),
            disabled_handlers: Vec::new(),
            handler_defaults: HandlerSettings::default(),
            handlers: BTreeMap::new(),
        }
    }
}

impl HandlerSetSettings {
    /// Effective settings for a handler.
    pub fn settings_for(&self, alias: &str) -> HandlerSettings {
        match self.handlers.get(alias) {
            Some(overrides) => self.handler_defaults.overlay(overrides),
            None => self.handler_defaults.clone(),
        }
    }

    /// Returns true if the handler is in the set.
    pub fn includes(&self, alias: &str, group: &str) -> bool {
        self.enabled
            && !self.disabled_handlers.iter().any(|d| d.eq_ignore_ascii_case(alias))
            && (self.handler_groups.is_empty()
                || self.handler_groups.iter().any(|g| g.eq_ignore_ascii_case(group)))
    }

    /// Sets the defaults.
    pub fn with_defaults(mut self, defaults: HandlerSettings) -> Self {
        self.handler_defaults = defaults;
        self
    }

    /// Adds a handler override.
    pub fn with_handler(mut self, alias: impl Into<String>, overrides: HandlerOverrides) -> Self {
        self.handlers.insert(alias.into(), overrides);
        self
    }

    /// Leaves a handler out.
    pub fn without_handler(mut self, alias: impl Into<String>) -> Self {
        self.disabled_handlers.push(alias.into());
        self
    }

    /// Limits the set to the given groups.
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.handler_groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }
}

/// Settings for the whole add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Folder sync files live in.
    pub root_folder: String,
    /// Handler set used when a request names none.
    pub default_set: String,
    /// Extension of sync files, without the dot.
    pub default_extension: String,
    /// Fail items with a missing parent in every handler.
    pub fail_on_missing_parent: bool,
    /// Keep unchanged items in report results.
    pub report_debug: bool,
    /// Write each import's actions to the history folder.
    pub enable_history: bool,
    /// Collapse results to per handler summaries.
    pub summary_dashboard: bool,
    /// Above this many actions results are always summarised.
    pub summary_limit: usize,
    /// Handler sets by name.
    pub handler_sets: BTreeMap<String, HandlerSetSettings>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let mut handler_sets = BTreeMap::new();
        handler_sets.insert("Default".to_string(), HandlerSetSettings::default());
        Self {
            root_folder: "uSync/v9/".to_string(),
            default_set: "Default".to_string(),
            default_extension: "config".to_string(),
            fail_on_missing_parent: false,
            report_debug: false,
            enable_history: false,
            summary_dashboard: false,
            summary_limit: 1000,
            handler_sets,
        }
    }
}

impl SyncSettings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> BackOfficeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses settings from JSON text.
    pub fn from_json(text: &str) -> BackOfficeResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The root folder as a path.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.root_folder)
    }

    /// A handler set by name, or the default set when `name` is empty.
    pub fn handler_set(&self, name: &str) -> BackOfficeResult<&HandlerSetSettings> {
        let name = if name.is_empty() { &self.default_set } else { name };
        self.handler_sets
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, set)| set)
            .ok_or_else(|| BackOfficeError::SetNotFound(name.to_string()))
    }

    /// Sets the root folder.
    pub fn with_root_folder(mut self, folder: impl Into<String>) -> Self {
        self.root_folder = folder.into();
        self
    }

    /// Adds or replaces a handler set.
    pub fn with_set(mut self, name: impl Into<String>, set: HandlerSetSettings) -> Self {
        self.handler_sets.insert(name.into(), set);
        self
    }

    /// Fails missing parents everywhere.
    pub fn with_fail_on_missing_parent(mut self, fail: bool) -> Self {
        self.fail_on_missing_parent = fail;
        self
    }

    /// Keeps unchanged items in reports.
    pub fn with_report_debug(mut self, debug: bool) -> Self {
        self.report_debug = debug;
        self
    }

    /// Records import history.
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.enable_history = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.root_folder, "uSync/v9/");
        assert_eq!(settings.default_extension, "config");
        assert!(settings.handler_set("").is_ok());
        assert!(settings.handler_set("default").is_ok());
        assert!(matches!(
            settings.handler_set("Missing"),
            Err(BackOfficeError::SetNotFound(_))
        ));
    }

    #[test]
    fn json_with_missing_fields_uses_defaults() {
        let settings = SyncSettings::from_json(
            r#"{
                "rootFolder": "sync/",
                "handlerSets": {
                    "Default": {
                        "handlerDefaults": { "guidNames": true },
                        "handlers": {
                            "contentHandler": { "useFlatStructure": false, "settings": { "IncludeChildren": "true" } }
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.root_folder, "sync/");
        assert_eq!(settings.default_set, "Default");
        let set = settings.handler_set("Default").unwrap();
        assert!(set.enabled);

        let content = set.settings_for("contentHandler");
        assert!(content.guid_names);
        assert!(!content.use_flat_structure);
        assert!(content.setting_bool("IncludeChildren", false));

        let other = set.settings_for("dataTypeHandler");
        assert!(other.guid_names);
        assert!(other.use_flat_structure);
    }

    #[test]
    fn overlay_merges_settings_bag() {
        let defaults = HandlerSettings::default()
            .with_setting("A", "1")
            .with_setting("B", "1");
        let mut overrides = HandlerOverrides::default();
        overrides.settings.insert("B".into(), "2".into());
        overrides.actions = Some(vec![HandlerAction::Export]);

        let merged = defaults.overlay(&overrides);
        assert_eq!(merged.settings.get("A").map(String::as_str), Some("1"));
        assert_eq!(merged.settings.get("B").map(String::as_str), Some("2"));
        assert!(merged.allows(HandlerAction::Export));
        assert!(!merged.allows(HandlerAction::Import));
    }

    #[test]
    fn set_membership() {
        let set = HandlerSetSettings::default()
            .with_groups(&["Settings"])
            .without_handler("macroHandler");
        assert!(set.includes("dataTypeHandler", "Settings"));
        assert!(!set.includes("contentHandler", "Content"));
        assert!(!set.includes("macroHandler", "Settings"));
    }
}
