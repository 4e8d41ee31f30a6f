//! Root and child site configuration merging.
//!
//! A child site's data type can store only its *difference* from a root
//! data type. On import the difference is merged back over the root
//! configuration. Array properties (blocks, crops, groups) are merged item
//! by item using a natural key; a root item the child removed is written to
//! the difference with its label prefixed by [`REMOVED_LABEL`] so the merge
//! can drop it again. Plain keys the child removed are listed under a
//! [`REMOVED_LABEL`] key of the difference.

use crate::error::CoreResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Label prefix marking a root item removed in the child site.
pub const REMOVED_LABEL: &str = "uSync:Removed in child site.";

/// An array property merged by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedProperty {
    /// Configuration key holding the array.
    pub property: &'static str,
    /// Field identifying an item in the array.
    pub key: &'static str,
    /// Field that carries the removed marker.
    pub label: &'static str,
}

impl MergedProperty {
    /// Creates a merged property labelled through `label`.
    pub const fn new(property: &'static str, key: &'static str) -> Self {
        Self {
            property,
            key,
            label: "label",
        }
    }
}

/// Merges and diffs configuration for a set of property editors.
pub trait ConfigMerger: Send + Sync {
    /// Property editor aliases handled.
    fn editors(&self) -> &[&'static str];

    /// Array properties merged by key.
    fn merged_properties(&self) -> &[MergedProperty];

    /// Root configuration overlaid with the target.
    fn get_merged_config(&self, root: &Value, target: &Value) -> Value {
        merge_config(root, target, self.merged_properties())
    }

    /// What the target changes relative to the root.
    fn get_difference_config(&self, root: &Value, target: &Value) -> Value {
        difference_config(root, target, self.merged_properties())
    }
}

/// A merger defined entirely by its editors and keyed arrays.
#[derive(Debug, Clone)]
pub struct ArrayMerger {
    editors: Vec<&'static str>,
    properties: Vec<MergedProperty>,
}

impl ArrayMerger {
    /// Creates a merger.
    pub fn new(editors: Vec<&'static str>, properties: Vec<MergedProperty>) -> Self {
        Self { editors, properties }
    }

    /// Block list: blocks keyed by element type.
    pub fn block_list() -> Self {
        Self::new(
            vec!["Umbraco.BlockList"],
            vec![MergedProperty::new("blocks", "contentElementTypeKey")],
        )
    }

    /// Block grid: blocks keyed by element type, groups by name.
    pub fn block_grid() -> Self {
        Self::new(
            vec!["Umbraco.BlockGrid"],
            vec![
                MergedProperty::new("blocks", "contentElementTypeKey"),
                MergedProperty::new("blockGroups", "name"),
            ],
        )
    }

    /// Image cropper: crops keyed by alias.
    pub fn image_cropper() -> Self {
        Self::new(
            vec!["Umbraco.ImageCropper"],
            vec![MergedProperty::new("crops", "alias")],
        )
    }

    /// File upload: extensions keyed by value.
    pub fn file_upload() -> Self {
        Self::new(
            vec!["Umbraco.UploadField"],
            vec![MergedProperty::new("fileExtensions", "value")],
        )
    }
}

impl ConfigMerger for ArrayMerger {
    fn editors(&self) -> &[&'static str] {
        &self.editors
    }

    fn merged_properties(&self) -> &[MergedProperty] {
        &self.properties
    }
}

fn items<'a>(config: &'a Map<String, Value>, property: &str) -> &'a [Value] {
    config
        .get(property)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn key_of<'a>(item: &'a Value, key: &str) -> &'a Value {
    item.get(key).unwrap_or(&Value::Null)
}

/// Returns true if the item carries the removed marker.
pub fn is_removed(item: &Value, label: &str) -> bool {
    item.get(label)
        .and_then(Value::as_str)
        .is_some_and(|l| l.starts_with(REMOVED_LABEL))
}

fn mark_removed(item: &Value, label: &str) -> Value {
    let mut marked = item.clone();
    if let Value::Object(map) = &mut marked {
        let original = map.get(label).and_then(Value::as_str).unwrap_or("");
        let text = format!("{REMOVED_LABEL}{original}");
        map.insert(label.to_string(), Value::String(text));
    }
    marked
}

/// Merges `target` over `root`.
///
/// Non-array keys take the target value; keys listed under [`REMOVED_LABEL`]
/// are dropped. For each merged property the
/// result is the target's items (minus removed markers) in target order,
/// followed by root items whose key the target does not mention.
pub fn merge_config(root: &Value, target: &Value, properties: &[MergedProperty]) -> Value {
    let (Value::Object(root), Value::Object(target)) = (root, target) else {
        return target.clone();
    };

    let mut merged = root.clone();
    for (key, value) in target.iter().filter(|(k, _)| *k != REMOVED_LABEL) {
        merged.insert(key.clone(), value.clone());
    }
    for removed in target
        .get(REMOVED_LABEL)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        merged.remove(removed);
    }

    for property in properties {
        if !root.contains_key(property.property) && !target.contains_key(property.property) {
            continue;
        }
        let target_items = items(target, property.property);
        let target_keys: Vec<&Value> = target_items.iter().map(|i| key_of(i, property.key)).collect();

        let combined: Vec<Value> = target_items
            .iter()
            .filter(|i| !is_removed(i, property.label))
            .chain(
                items(root, property.property)
                    .iter()
                    .filter(|i| !target_keys.contains(&key_of(i, property.key))),
            )
            .cloned()
            .collect();
        merged.insert(property.property.to_string(), Value::Array(combined));
    }

    Value::Object(merged)
}

/// Computes what `target` changes relative to `root`.
///
/// Non-array keys are kept when they differ from the root, and root keys
/// missing from the target are listed under [`REMOVED_LABEL`]. For each merged
/// property the result holds target items that are new or changed, in
/// target order, followed by root items missing from the target marked as
/// removed.
pub fn difference_config(root: &Value, target: &Value, properties: &[MergedProperty]) -> Value {
    let (Value::Object(root), Value::Object(target)) = (root, target) else {
        return target.clone();
    };

    let mut difference = Map::new();
    for (key, value) in target {
        if properties.iter().any(|p| p.property == key) {
            continue;
        }
        if root.get(key) != Some(value) {
            difference.insert(key.clone(), value.clone());
        }
    }

    let removed: Vec<Value> = root
        .keys()
        .filter(|key| !target.contains_key(*key) && !properties.iter().any(|p| p.property == *key))
        .map(|key| Value::String(key.clone()))
        .collect();
    if !removed.is_empty() {
        difference.insert(REMOVED_LABEL.to_string(), Value::Array(removed));
    }

    for property in properties {
        let root_items = items(root, property.property);
        let target_items = items(target, property.property);

        let mut changed: Vec<Value> = target_items
            .iter()
            .filter(|item| {
                let key = key_of(item, property.key);
                root_items
                    .iter()
                    .find(|r| key_of(r, property.key) == key)
                    .is_none_or(|r| r != *item)
            })
            .cloned()
            .collect();

        changed.extend(
            root_items
                .iter()
                .filter(|r| {
                    let key = key_of(r, property.key);
                    !target_items.iter().any(|t| key_of(t, property.key) == key)
                })
                .map(|r| mark_removed(r, property.label)),
        );

        if !changed.is_empty() {
            difference.insert(property.property.to_string(), Value::Array(changed));
        }
    }

    Value::Object(difference)
}

/// Registry of config mergers, keyed by editor alias.
#[derive(Default)]
pub struct ConfigMergerRegistry {
    by_editor: HashMap<String, Arc<dyn ConfigMerger>>,
}

impl std::fmt::Debug for ConfigMergerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut editors: Vec<&String> = self.by_editor.keys().collect();
        editors.sort();
        f.debug_struct("ConfigMergerRegistry").field("editors", &editors).finish()
    }
}

impl ConfigMergerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the block list, block grid, image cropper and
    /// file upload mergers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ArrayMerger::block_list()));
        registry.register(Arc::new(ArrayMerger::block_grid()));
        registry.register(Arc::new(ArrayMerger::image_cropper()));
        registry.register(Arc::new(ArrayMerger::file_upload()));
        registry
    }

    /// Registers a merger, replacing any existing merger for its editors.
    pub fn register(&mut self, merger: Arc<dyn ConfigMerger>) {
        for editor in merger.editors() {
            self.by_editor.insert((*editor).to_string(), Arc::clone(&merger));
        }
    }

    /// The merger for an editor.
    pub fn get(&self, editor: &str) -> Option<&Arc<dyn ConfigMerger>> {
        self.by_editor.get(editor)
    }

    /// Merges configuration. Editors without a merger take the target as is.
    pub fn merge(&self, editor: &str, root: &Value, target: &Value) -> Value {
        match self.get(editor) {
            Some(merger) => merger.get_merged_config(root, target),
            None => merge_config(root, target, &[]),
        }
    }

    /// Computes a difference. Editors without a merger diff top level keys only.
    pub fn difference(&self, editor: &str, root: &Value, target: &Value) -> Value {
        match self.get(editor) {
            Some(merger) => merger.get_difference_config(root, target),
            None => difference_config(root, target, &[]),
        }
    }

    /// [`merge`](Self::merge) over JSON text.
    pub fn merge_json(&self, editor: &str, root: &str, target: &str) -> CoreResult<String> {
        let root: Value = serde_json::from_str(root)?;
        let target: Value = serde_json::from_str(target)?;
        Ok(serde_json::to_string_pretty(&self.merge(editor, &root, &target))?)
    }

    /// [`difference`](Self::difference) over JSON text.
    pub fn difference_json(&self, editor: &str, root: &str, target: &str) -> CoreResult<String> {
        let root: Value = serde_json::from_str(root)?;
        let target: Value = serde_json::from_str(target)?;
        Ok(serde_json::to_string_pretty(&self.difference(editor, &root, &target))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const BLOCK_LIST: &str = "Umbraco.BlockList";

    fn block(key: &str, label: &str) -> Value {
        json!({"contentElementTypeKey": key, "label": label})
    }

    #[test]
    fn merge_appends_root_only_items() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"blocks": [block("a", "A"), block("b", "B")], "max": 5});
        let target = json!({"blocks": [block("c", "C"), block("a", "A2")]});

        let merged = registry.merge(BLOCK_LIST, &root, &target);
        assert_eq!(
            merged,
            json!({"blocks": [block("c", "C"), block("a", "A2"), block("b", "B")], "max": 5})
        );
    }

    #[test]
    fn merge_drops_removed_markers() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"blocks": [block("a", "A"), block("b", "B")]});
        let target = json!({"blocks": [block("b", &format!("{REMOVED_LABEL}B"))]});

        let merged = registry.merge(BLOCK_LIST, &root, &target);
        assert_eq!(merged, json!({"blocks": [block("a", "A")]}));
    }

    #[test]
    fn difference_marks_removed_root_items() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"blocks": [block("a", "A"), block("b", "B")], "max": 5, "min": 0});
        let target = json!({"blocks": [block("a", "A"), block("c", "C")], "max": 7, "min": 0});

        let difference = registry.difference(BLOCK_LIST, &root, &target);
        assert_eq!(
            difference,
            json!({
                "blocks": [block("c", "C"), block("b", &format!("{REMOVED_LABEL}B"))],
                "max": 7
            })
        );
    }

    #[test]
    fn difference_then_merge_restores_target() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"crops": [
            {"alias": "thumb", "width": 100, "height": 100},
            {"alias": "hero", "width": 1200, "height": 400},
        ]});
        let target = json!({"crops": [
            {"alias": "thumb", "width": 150, "height": 150},
            {"alias": "square", "width": 300, "height": 300},
        ]});

        let difference = registry.difference("Umbraco.ImageCropper", &root, &target);
        let merged = registry.merge("Umbraco.ImageCropper", &root, &difference);
        assert_eq!(merged, target);
    }

    #[test]
    fn plain_keys_removed_in_child_survive_the_round_trip() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"blocks": [block("a", "A")], "max": 5, "useLiveEditing": true});
        let target = json!({"blocks": [block("a", "A")], "max": 5});

        let difference = registry.difference(BLOCK_LIST, &root, &target);
        assert_eq!(difference, json!({ REMOVED_LABEL: ["useLiveEditing"] }));
        assert_eq!(registry.merge(BLOCK_LIST, &root, &difference), target);

        let plain = registry.difference("My.Editor", &json!({"a": 1, "b": 2}), &json!({"a": 1}));
        assert_eq!(registry.merge("My.Editor", &json!({"a": 1, "b": 2}), &plain), json!({"a": 1}));
    }

    #[test]
    fn block_grid_groups_by_name() {
        let registry = ConfigMergerRegistry::with_defaults();
        let root = json!({"blocks": [], "blockGroups": [{"name": "Layout"}, {"name": "Content"}]});
        let target = json!({"blocks": [], "blockGroups": [{"name": "Content"}]});

        let difference = registry.difference("Umbraco.BlockGrid", &root, &target);
        assert_eq!(
            difference,
            json!({"blockGroups": [{"name": "Layout", "label": REMOVED_LABEL}]})
        );
    }

    #[test]
    fn json_wrappers() {
        let registry = ConfigMergerRegistry::with_defaults();
        let merged = registry
            .merge_json(
                "Umbraco.UploadField",
                r#"{"fileExtensions":[{"value":"pdf"}]}"#,
                r#"{"fileExtensions":[{"value":"docx"}]}"#,
            )
            .unwrap();
        let merged: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(merged, json!({"fileExtensions": [{"value": "docx"}, {"value": "pdf"}]}));
        assert!(registry.merge_json("Umbraco.UploadField", "{", "{}").is_err());
    }

    fn block_set() -> impl Strategy<Value = Vec<(u8, String)>> {
        proptest::collection::btree_map(0u8..12, "[a-z]{1,5}", 0..8)
            .prop_map(|m| m.into_iter().collect())
    }

    fn blocks(items: &[(u8, String)]) -> Value {
        Value::Array(items.iter().map(|(k, l)| block(&k.to_string(), l)).collect())
    }

    proptest! {
        #[test]
        fn merge_never_drops_target_items(root in block_set(), target in block_set()) {
            let root = json!({"blocks": blocks(&root)});
            let target_items = blocks(&target);
            let merged = merge_config(
                &root,
                &json!({"blocks": target_items.clone()}),
                ArrayMerger::block_list().merged_properties(),
            );
            let merged_items = merged["blocks"].as_array().unwrap();
            for item in target_items.as_array().unwrap() {
                prop_assert!(merged_items.contains(item));
            }
        }

        #[test]
        fn difference_of_merge_is_target_changes(root in block_set(), target in block_set()) {
            let properties = ArrayMerger::block_list().merged_properties().to_vec();
            let root_value = json!({"blocks": blocks(&root)});
            let merged = merge_config(&root_value, &json!({"blocks": blocks(&target)}), &properties);
            let difference = difference_config(&root_value, &merged, &properties);

            let surfaced: Vec<Value> = difference
                .get("blocks")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let expected: Vec<Value> = blocks(&target)
                .as_array()
                .unwrap()
                .iter()
                .filter(|t| !blocks(&root).as_array().unwrap().contains(t))
                .cloned()
                .collect();
            prop_assert_eq!(surfaced, expected);
        }
    }
}
