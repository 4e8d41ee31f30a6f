//! Inspect command implementation.

use super::handler_folders;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use usync_backoffice::SyncFileStore;
use usync_xml::{FormatCheck, FORMAT_VERSION};

/// Folder inspection result.
#[derive(Debug, Default, Serialize)]
pub struct InspectResult {
    /// Sync root.
    pub path: String,
    /// Format of the folder's version file.
    pub format: String,
    /// Per handler folder statistics.
    pub folders: Vec<FolderStats>,
}

/// Statistics for one handler folder.
#[derive(Debug, Default, Serialize)]
pub struct FolderStats {
    /// Folder name.
    pub name: String,
    /// Item files.
    pub items: usize,
    /// Delete and rename tombstones.
    pub tombstones: usize,
    /// Clean markers.
    pub clean_markers: usize,
    /// Files that could not be read.
    pub unreadable: usize,
    /// Item count by root element.
    pub item_types: BTreeMap<String, usize>,
}

/// Collects statistics for a sync folder.
pub fn inspect(root: &Path, extension: &str) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !root.is_dir() {
        return Err(format!("No sync folder found at {}", root.display()).into());
    }

    let store = SyncFileStore::new(extension);
    let format = match store.check_version(root) {
        Ok(None) => "missing".to_string(),
        Ok(Some(FormatCheck::Current)) => format!("current ({FORMAT_VERSION})"),
        Ok(Some(FormatCheck::Older(found))) => format!("older ({found})"),
        Ok(Some(FormatCheck::Newer(found))) => format!("newer ({found})"),
        Ok(Some(FormatCheck::Unknown)) | Err(_) => "unreadable".to_string(),
    };

    let mut result = InspectResult {
        path: root.display().to_string(),
        format,
        folders: Vec::new(),
    };

    for folder in handler_folders(root)? {
        let mut stats = FolderStats {
            name: folder
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            ..FolderStats::default()
        };
        for path in store.files(&folder)? {
            match store.load(&path) {
                Ok(node) if node.is_empty_item() => stats.tombstones += 1,
                Ok(node) => {
                    stats.items += 1;
                    *stats.item_types.entry(node.name().to_string()).or_default() += 1;
                }
                Err(_) => stats.unreadable += 1,
            }
        }
        stats.clean_markers = store.clean_markers(&folder).map(|m| m.len()).unwrap_or(0);
        result.folders.push(stats);
    }

    Ok(result)
}

/// Runs the inspect command.
pub fn run(root: &Path, extension: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(root, extension)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("uSync Folder Inspection");
    println!("=======================");
    println!();
    println!("Path:   {}", result.path);
    println!("Format: {}", result.format);
    println!();

    if result.folders.is_empty() {
        println!("No handler folders.");
        return;
    }

    println!("Folders:");
    for folder in &result.folders {
        println!(
            "  {:<16} {:>5} items, {} tombstones, {} clean markers",
            folder.name, folder.items, folder.tombstones, folder.clean_markers
        );
        if folder.unreadable > 0 {
            println!("  {:<16} {:>5} unreadable files", "", folder.unreadable);
        }
        for (item_type, count) in &folder.item_types {
            println!("    {item_type}: {count}");
        }
    }

    let total: usize = result.folders.iter().map(|f| f.items).sum();
    println!();
    println!("Total items: {total}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use usync_xml::{to_xml_string, version_element, EmptyAction, XElement};
    use uuid::Uuid;

    fn write(path: &Path, node: &XElement) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, to_xml_string(node).unwrap()).unwrap();
    }

    #[test]
    fn counts_items_tombstones_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("usync.config"), &version_element(FORMAT_VERSION));
        let item = XElement::new("DataType")
            .with_attr("Key", Uuid::new_v4().to_string())
            .with_attr("Alias", "text");
        write(&root.join("DataTypes/text.config"), &item);
        write(
            &root.join("DataTypes/gone.config"),
            &XElement::empty(EmptyAction::Delete, "gone", Uuid::new_v4()),
        );
        write(
            &root.join("DataTypes/_clean/root.config"),
            &XElement::empty(EmptyAction::Clean, "", Uuid::nil()),
        );
        std::fs::write(root.join("DataTypes/broken.config"), "<DataType").unwrap();
        std::fs::create_dir_all(root.join("history")).unwrap();

        let result = inspect(root, "config").unwrap();
        assert!(result.format.starts_with("current"));
        assert_eq!(result.folders.len(), 1);
        let stats = &result.folders[0];
        assert_eq!(stats.name, "DataTypes");
        assert_eq!(stats.items, 1);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(stats.clean_markers, 1);
        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.item_types.get("DataType"), Some(&1));
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("nope"), "config").is_err());
    }
}
