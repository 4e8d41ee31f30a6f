//! Data type configuration commands.

use serde_json::Value;
use std::path::Path;
use tracing::debug;
use usync_core::configuration::{ConfigMergerRegistry, ConfigurationSerializerRegistry};

/// Migrates a configuration for `editor` to the current shape.
pub fn migrate_json(editor: &str, text: &str) -> Result<String, Box<dyn std::error::Error>> {
    let config: Value = serde_json::from_str(text)?;
    let registry = ConfigurationSerializerRegistry::with_defaults();
    if registry.get(editor).is_none() {
        debug!(editor, "no migration registered, configuration unchanged");
    }
    Ok(serde_json::to_string_pretty(&registry.import(editor, &config))?)
}

/// Merges `target` over `root`, or computes their difference.
pub fn merge_json(editor: &str, root: &str, target: &str, difference: bool) -> Result<String, Box<dyn std::error::Error>> {
    let registry = ConfigMergerRegistry::with_defaults();
    let merged = if difference {
        registry.difference_json(editor, root, target)?
    } else {
        registry.merge_json(editor, root, target)?
    };
    Ok(merged)
}

/// Runs the migrate-config command.
pub fn migrate(editor: &str, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", migrate_json(editor, &std::fs::read_to_string(file)?)?);
    Ok(())
}

/// Runs the merge-config command.
pub fn merge(editor: &str, root: &Path, target: &Path, difference: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::read_to_string(root)?;
    let target = std::fs::read_to_string(target)?;
    println!("{}", merge_json(editor, &root, &target, difference)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_editor_is_unchanged() {
        let migrated = migrate_json("My.Editor", r#"{"a":1}"#).unwrap();
        let value: Value = serde_json::from_str(&migrated).unwrap();
        assert_eq!(value, serde_json::json!({ "a": 1 }));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(migrate_json("Umbraco.Tags", "{").is_err());
        assert!(merge_json("Umbraco.BlockList", "{", "{}", false).is_err());
    }

    #[test]
    fn merge_without_a_merger_keeps_target_values() {
        let merged = merge_json("My.Editor", r#"{"a":1,"b":2}"#, r#"{"b":3}"#, false).unwrap();
        let value: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value["b"], 3);
    }
}
