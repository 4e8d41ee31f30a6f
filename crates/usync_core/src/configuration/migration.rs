//! Property editor configuration migrations.
//!
//! Older sites store editor configuration with PascalCase keys and
//! id/value item lists. Each [`ConfigurationSerializer`] rewrites one
//! editor's legacy shape into the current one on import.
//!
//! ## Rules
//!
//! - Migrations are pure: the input map is never modified.
//! - Migrations are idempotent: already migrated input comes back unchanged.
//! - A migration that fails leaves the configuration untouched; the
//!   registry logs the failure and imports the original value.
//!
//! ## Usage
//!
//! ```
//! use usync_core::configuration::ConfigurationSerializerRegistry;
//! use serde_json::json;
//!
//! let registry = ConfigurationSerializerRegistry::with_defaults();
//! let config = registry.import("Umbraco.MultipleTextstring", &json!({"Maximum": 4, "Minimum": 1}));
//! assert_eq!(config, json!({"max": 4, "min": 1}));
//! ```

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts legacy configuration for a set of property editors.
pub trait ConfigurationSerializer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Property editor aliases this serializer applies to.
    fn editors(&self) -> &[&'static str];

    /// Returns the configuration in its current shape.
    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>>;
}

/// Registry of configuration serializers, keyed by editor alias.
#[derive(Default)]
pub struct ConfigurationSerializerRegistry {
    by_editor: HashMap<String, Arc<dyn ConfigurationSerializer>>,
}

impl std::fmt::Debug for ConfigurationSerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut editors: Vec<&String> = self.by_editor.keys().collect();
        editors.sort();
        f.debug_struct("ConfigurationSerializerRegistry")
            .field("editors", &editors)
            .finish()
    }
}

impl ConfigurationSerializerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in migrations.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn ConfigurationSerializer>; 5] = [
            Arc::new(MultipleTextMigration),
            Arc::new(ValueListMigration),
            Arc::new(TagsMigration),
            Arc::new(ColorPickerMigration),
            Arc::new(PickerMigration),
        ];
        for serializer in defaults {
            let name = serializer.name().to_string();
            if let Err(err) = registry.register(serializer) {
                warn!(serializer = %name, error = %err, "built in migration skipped");
            }
        }
        registry
    }

    /// Registers a serializer for all of its editors.
    ///
    /// Returns an error if one of its editors already has a serializer.
    pub fn register(&mut self, serializer: Arc<dyn ConfigurationSerializer>) -> CoreResult<()> {
        if let Some(editor) = serializer
            .editors()
            .iter()
            .find(|e| self.by_editor.contains_key(**e))
        {
            return Err(CoreError::invalid_config(
                *editor,
                format!("{} registers an editor that already has a migration", serializer.name()),
            ));
        }
        for editor in serializer.editors() {
            self.by_editor.insert((*editor).to_string(), Arc::clone(&serializer));
        }
        Ok(())
    }

    /// The serializer for an editor, if one is registered.
    pub fn get(&self, editor: &str) -> Option<&Arc<dyn ConfigurationSerializer>> {
        self.by_editor.get(editor)
    }

    /// Migrates configuration for `editor`.
    ///
    /// Returns the input unchanged when there is no serializer for the
    /// editor, when the configuration is not an object, or when the
    /// migration fails.
    pub fn import(&self, editor: &str, config: &Value) -> Value {
        let (Some(serializer), Value::Object(map)) = (self.get(editor), config) else {
            return config.clone();
        };
        match serializer.get_configuration_import(map) {
            Ok(migrated) => Value::Object(migrated),
            Err(err) => {
                debug!(editor, serializer = serializer.name(), error = %err, "config migration failed, keeping original");
                config.clone()
            }
        }
    }
}

/// Moves `from` to `to` when `from` is present, converting the value.
///
/// An existing `to` key wins over the legacy one.
fn rename(
    map: &mut Map<String, Value>,
    from: &str,
    to: &str,
    convert: impl FnOnce(Value) -> CoreResult<Value>,
) -> CoreResult<()> {
    if let Some(value) = map.remove(from) {
        if !map.contains_key(to) {
            map.insert(to.to_string(), convert(value)?);
        }
    }
    Ok(())
}

fn to_number(value: Value) -> CoreResult<Value> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Number(Number::from(0))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(Number::from(n)))
            .map_err(|_| CoreError::invalid_config("number", format!("'{s}' is not a number"))),
        other => Ok(other),
    }
}

fn to_bool(value: Value) -> CoreResult<Value> {
    Ok(Value::Bool(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        _ => false,
    }))
}

/// Legacy `[{id, value}]` arrays or `{"id": {value}}` maps, ordered by id.
fn legacy_items(items: &Value) -> Option<Vec<(i64, Value)>> {
    let mut ordered: Vec<(i64, Value)> = match items {
        Value::Array(array) => {
            if !array.iter().any(|i| i.get("id").is_some()) {
                return None;
            }
            array
                .iter()
                .enumerate()
                .map(|(position, item)| {
                    let id = item.get("id").and_then(id_of).unwrap_or(position as i64);
                    (id, item.get("value").cloned().unwrap_or(Value::Null))
                })
                .collect()
        }
        Value::Object(map) => map
            .iter()
            .enumerate()
            .map(|(position, (id, item))| {
                let id = id.parse().unwrap_or(position as i64);
                let value = item.get("value").cloned().unwrap_or_else(|| item.clone());
                (id, value)
            })
            .collect(),
        _ => return None,
    };
    ordered.sort_by_key(|(id, _)| *id);
    Some(ordered)
}

fn id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `Umbraco.MultipleTextstring`: `Maximum`/`Minimum` become `max`/`min`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleTextMigration;

impl ConfigurationSerializer for MultipleTextMigration {
    fn name(&self) -> &str {
        "MultipleTextstring"
    }

    fn editors(&self) -> &[&'static str] {
        &["Umbraco.MultipleTextstring"]
    }

    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        let mut map = config.clone();
        rename(&mut map, "Maximum", "max", to_number)?;
        rename(&mut map, "Minimum", "min", to_number)?;
        Ok(map)
    }
}

/// Dropdown, checkbox list and radio button list: id/value items become an
/// ordered string array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueListMigration;

impl ConfigurationSerializer for ValueListMigration {
    fn name(&self) -> &str {
        "ValueList"
    }

    fn editors(&self) -> &[&'static str] {
        &[
            "Umbraco.DropDown.Flexible",
            "Umbraco.CheckBoxList",
            "Umbraco.RadioButtonList",
        ]
    }

    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        let mut map = config.clone();
        rename(&mut map, "Items", "items", Ok)?;
        rename(&mut map, "Multiple", "multiple", to_bool)?;

        if let Some(items) = map.get("items").and_then(legacy_items) {
            let values = items
                .into_iter()
                .map(|(_, value)| match value {
                    Value::String(s) => Ok(Value::String(s)),
                    Value::Number(n) => Ok(Value::String(n.to_string())),
                    other => Err(CoreError::invalid_config(
                        "Umbraco.DropDown.Flexible",
                        format!("unexpected item value {other}"),
                    )),
                })
                .collect::<CoreResult<Vec<Value>>>()?;
            map.insert("items".to_string(), Value::Array(values));
        }
        Ok(map)
    }
}

/// `Umbraco.Tags`: numeric storage type becomes a named array.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagsMigration;

fn storage_type(value: Value) -> CoreResult<Value> {
    let name = match &value {
        Value::Array(_) => return Ok(value),
        Value::Number(n) => match n.as_i64() {
            Some(0) => "csv",
            Some(1) => "Json",
            _ => return Err(CoreError::invalid_config("Umbraco.Tags", format!("unknown storage type {n}"))),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "csv" => "csv",
            "1" | "json" => "Json",
            _ => return Err(CoreError::invalid_config("Umbraco.Tags", format!("unknown storage type {s}"))),
        },
        other => {
            return Err(CoreError::invalid_config(
                "Umbraco.Tags",
                format!("unexpected storage type {other}"),
            ))
        }
    };
    Ok(Value::Array(vec![Value::String(name.to_string())]))
}

impl ConfigurationSerializer for TagsMigration {
    fn name(&self) -> &str {
        "Tags"
    }

    fn editors(&self) -> &[&'static str] {
        &["Umbraco.Tags"]
    }

    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        let mut map = config.clone();
        rename(&mut map, "Group", "group", Ok)?;
        rename(&mut map, "StorageType", "storageType", storage_type)?;
        if let Some(current) = map.remove("storageType") {
            map.insert("storageType".to_string(), storage_type(current)?);
        }
        Ok(map)
    }
}

/// `Umbraco.ColorPicker`: legacy items become `{value, label}` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorPickerMigration;

fn color_item(value: Value) -> Value {
    let parsed = match &value {
        Value::String(s) => serde_json::from_str::<Value>(s).ok(),
        Value::Object(_) => Some(value.clone()),
        _ => None,
    };

    if let Some(Value::Object(inner)) = parsed {
        let color = inner.get("value").cloned().unwrap_or(Value::Null);
        let label = inner.get("label").cloned().unwrap_or_else(|| color.clone());
        let mut item = Map::new();
        item.insert("label".to_string(), label);
        item.insert("value".to_string(), color);
        return Value::Object(item);
    }

    let mut item = Map::new();
    item.insert("label".to_string(), value.clone());
    item.insert("value".to_string(), value);
    Value::Object(item)
}

impl ConfigurationSerializer for ColorPickerMigration {
    fn name(&self) -> &str {
        "ColorPicker"
    }

    fn editors(&self) -> &[&'static str] {
        &["Umbraco.ColorPicker"]
    }

    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        let mut map = config.clone();
        rename(&mut map, "Items", "items", Ok)?;
        rename(&mut map, "UseLabel", "useLabel", to_bool)?;

        if let Some(items) = map.get("items").and_then(legacy_items) {
            let values = items.into_iter().map(|(_, v)| color_item(v)).collect();
            map.insert("items".to_string(), Value::Array(values));
        }
        Ok(map)
    }
}

/// Content, media and tree pickers: PascalCase keys become camelCase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickerMigration;

fn camel_case(key: &str) -> Option<String> {
    let mut chars = key.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

impl ConfigurationSerializer for PickerMigration {
    fn name(&self) -> &str {
        "Pickers"
    }

    fn editors(&self) -> &[&'static str] {
        &[
            "Umbraco.ContentPicker",
            "Umbraco.MediaPicker3",
            "Umbraco.MultiNodeTreePicker",
        ]
    }

    fn get_configuration_import(&self, config: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        let mut map = config.clone();
        let legacy: Vec<(String, String)> = config
            .keys()
            .filter_map(|k| camel_case(k).map(|c| (k.clone(), c)))
            .collect();
        for (from, to) in legacy {
            rename(&mut map, &from, &to, Ok)?;
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn import(editor: &str, config: Value) -> Value {
        ConfigurationSerializerRegistry::with_defaults().import(editor, &config)
    }

    #[test]
    fn multiple_text_renames_limits() {
        let migrated = import("Umbraco.MultipleTextstring", json!({"Maximum": 4, "Minimum": 1}));
        assert_eq!(migrated, json!({"max": 4, "min": 1}));
    }

    #[test]
    fn multiple_text_already_migrated() {
        let current = json!({"max": 4, "min": 1});
        assert_eq!(import("Umbraco.MultipleTextstring", current.clone()), current);
    }

    #[test]
    fn multiple_text_parses_strings() {
        let migrated = import("Umbraco.MultipleTextstring", json!({"Maximum": "4", "Minimum": ""}));
        assert_eq!(migrated, json!({"max": 4, "min": 0}));
    }

    #[test]
    fn value_list_orders_by_id() {
        let legacy = json!({"items": [
            {"id": 3, "value": "Two"},
            {"id": 1, "value": "Four"},
            {"id": 4, "value": "Three"},
            {"id": 2, "value": "One"},
        ]});
        let migrated = import("Umbraco.DropDown.Flexible", legacy);
        assert_eq!(migrated, json!({"items": ["Four", "One", "Two", "Three"]}));
    }

    #[test]
    fn value_list_object_form_and_multiple() {
        let legacy = json!({
            "Multiple": "1",
            "items": {"2": {"value": "b"}, "1": {"value": "a"}}
        });
        let migrated = import("Umbraco.CheckBoxList", legacy);
        assert_eq!(migrated, json!({"items": ["a", "b"], "multiple": true}));
    }

    #[test]
    fn tags_storage_type() {
        assert_eq!(
            import("Umbraco.Tags", json!({"StorageType": 0, "Group": "default"})),
            json!({"storageType": ["csv"], "group": "default"})
        );
        assert_eq!(
            import("Umbraco.Tags", json!({"StorageType": 1})),
            json!({"storageType": ["Json"]})
        );
    }

    #[test]
    fn unknown_storage_type_keeps_original() {
        let legacy = json!({"StorageType": 7});
        assert_eq!(import("Umbraco.Tags", legacy.clone()), legacy);
    }

    #[test]
    fn color_picker_items() {
        let legacy = json!({
            "UseLabel": "1",
            "items": [
                {"id": 2, "value": "{\"value\":\"00ff00\",\"label\":\"Green\"}"},
                {"id": 1, "value": "ff0000"},
            ]
        });
        let migrated = import("Umbraco.ColorPicker", legacy);
        assert_eq!(
            migrated,
            json!({
                "items": [
                    {"value": "ff0000", "label": "ff0000"},
                    {"value": "00ff00", "label": "Green"},
                ],
                "useLabel": true
            })
        );
    }

    #[test]
    fn pickers_camel_case() {
        let legacy = json!({"StartNodeId": "umb://document/abc", "ShowOpenButton": true, "ignoreUserStartNodes": false});
        assert_eq!(
            import("Umbraco.ContentPicker", legacy),
            json!({"startNodeId": "umb://document/abc", "showOpenButton": true, "ignoreUserStartNodes": false})
        );
    }

    #[test]
    fn unknown_editor_is_untouched() {
        let config = json!({"Maximum": 4});
        assert_eq!(import("Umbraco.TextBox", config.clone()), config);
    }

    #[test]
    fn every_built_in_migration_is_registered() {
        let registry = ConfigurationSerializerRegistry::with_defaults();
        let built_in: [Arc<dyn ConfigurationSerializer>; 5] = [
            Arc::new(MultipleTextMigration),
            Arc::new(ValueListMigration),
            Arc::new(TagsMigration),
            Arc::new(ColorPickerMigration),
            Arc::new(PickerMigration),
        ];
        for serializer in built_in {
            for editor in serializer.editors() {
                let found = registry.get(editor).map(|s| s.name());
                assert_eq!(found, Some(serializer.name()), "{editor}");
            }
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ConfigurationSerializerRegistry::with_defaults();
        assert!(registry.register(Arc::new(TagsMigration)).is_err());
    }

    fn legacy_config() -> impl Strategy<Value = (String, Value)> {
        prop_oneof![
            (0i64..100, 0i64..100).prop_map(|(max, min)| (
                "Umbraco.MultipleTextstring".to_string(),
                json!({"Maximum": max, "Minimum": min})
            )),
            proptest::collection::vec("[a-z]{1,6}", 0..6).prop_map(|values| {
                let items: Vec<Value> = values
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, v)| json!({"id": i, "value": v}))
                    .collect();
                ("Umbraco.RadioButtonList".to_string(), json!({"items": items}))
            }),
            (0i64..2, "[a-z]{0,6}").prop_map(|(storage, group)| (
                "Umbraco.Tags".to_string(),
                json!({"StorageType": storage, "Group": group})
            )),
            proptest::collection::vec("[0-9a-f]{6}", 0..5).prop_map(|colors| {
                let items: Vec<Value> = colors
                    .iter()
                    .enumerate()
                    .map(|(i, c)| json!({"id": i, "value": c}))
                    .collect();
                ("Umbraco.ColorPicker".to_string(), json!({"items": items, "UseLabel": false}))
            }),
            ("[A-Z][a-z]{1,6}", any::<bool>()).prop_map(|(key, value)| {
                let mut map = Map::new();
                map.insert(key, Value::Bool(value));
                ("Umbraco.MediaPicker3".to_string(), Value::Object(map))
            }),
        ]
    }

    proptest! {
        #[test]
        fn migrations_are_idempotent((editor, config) in legacy_config()) {
            let registry = ConfigurationSerializerRegistry::with_defaults();
            let once = registry.import(&editor, &config);
            let twice = registry.import(&editor, &once);
            prop_assert_eq!(once, twice);
        }
    }
}
