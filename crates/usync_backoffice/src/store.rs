//! Sync folder layout on disk.
//!
//! ```text
//! <root>/
//! ├─ usync.config            # format version
//! ├─ DataTypes/
//! │  └─ textstring.config
//! └─ Content/
//!    ├─ _clean/
//!    │  └─ <parent key>.config
//!    └─ home/
//!       └─ about.config      # nested layout
//! ```
//!
//! One file per item. Files are written to a temporary name and renamed so a
//! crash never leaves a half written item behind.

use crate::error::BackOfficeResult;
use crate::settings::HandlerSettings;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use usync_xml::{format_of, parse, to_xml_string, version_element, EmptyAction, FormatCheck, XElement, VERSION_FILE};
use uuid::Uuid;

/// Folder, inside a handler folder, holding clean markers.
pub const CLEAN_FOLDER: &str = "_clean";

/// Makes a string safe to use as a file or folder name.
///
/// Characters that are not allowed in file names on common platforms become
/// `_`, and the result is lower case.
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_lowercase();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Reads and writes sync files.
#[derive(Debug, Clone)]
pub struct SyncFileStore {
    extension: String,
}

impl Default for SyncFileStore {
    fn default() -> Self {
        Self::new("config")
    }
}

impl SyncFileStore {
    /// Creates a store for files with the given extension.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn file_name(&self, name: &str) -> String {
        format!("{name}.{}", self.extension)
    }

    fn is_sync_file(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
            && path.file_name().and_then(|n| n.to_str()) != Some(VERSION_FILE)
    }

    /// Where an item is written.
    ///
    /// `ancestors` are the names of the item's parents, root first; they are
    /// only used for the nested layout.
    pub fn item_path(
        &self,
        folder: &Path,
        key: Uuid,
        alias: &str,
        ancestors: &[String],
        settings: &HandlerSettings,
    ) -> PathBuf {
        let name = if settings.guid_names {
            key.to_string()
        } else {
            safe_file_name(alias)
        };

        let mut path = folder.to_path_buf();
        if !settings.use_flat_structure {
            for ancestor in ancestors {
                path.push(safe_file_name(ancestor));
            }
        }
        path.push(self.file_name(&name));
        path
    }

    /// `path` with the item key added to the file name.
    ///
    /// Used when an item's own path already belongs to a sibling with the
    /// same name.
    pub fn keyed_path(&self, path: &Path, key: Uuid) -> PathBuf {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        path.with_file_name(self.file_name(&format!("{stem}_{key}")))
    }

    /// Path of the clean marker for the children of `parent`.
    ///
    /// The nil key stands for the root of the tree.
    pub fn clean_path(&self, folder: &Path, parent: Uuid) -> PathBuf {
        folder.join(CLEAN_FOLDER).join(self.file_name(&parent.to_string()))
    }

    /// Writes a node.
    pub fn save(&self, path: &Path, node: &XElement) -> BackOfficeResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = to_xml_string(node)?;
        let temp = path.with_extension(format!("{}.tmp", self.extension));
        fs::write(&temp, text)?;
        fs::rename(&temp, path)?;
        Ok(())
    }

    /// Reads a node.
    pub fn load(&self, path: &Path) -> BackOfficeResult<XElement> {
        let text = fs::read_to_string(path)?;
        Ok(parse(&text)?)
    }

    /// Removes a file, returning true if it existed.
    pub fn delete(&self, path: &Path) -> BackOfficeResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Every item file under `folder`, sorted by path.
    ///
    /// Clean markers are left out. A missing folder has no files.
    pub fn files(&self, folder: &Path) -> BackOfficeResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        if folder.is_dir() {
            self.collect(folder, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn collect(&self, folder: &Path, files: &mut Vec<PathBuf>) -> BackOfficeResult<()> {
        for entry in fs::read_dir(folder)? {
            let path = entry?.path();
            if path.is_dir() {
                if path.file_name().and_then(|n| n.to_str()) != Some(CLEAN_FOLDER) {
                    self.collect(&path, files)?;
                }
            } else if self.is_sync_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Clean markers in `folder`.
    pub fn clean_markers(&self, folder: &Path) -> BackOfficeResult<Vec<(PathBuf, XElement)>> {
        let clean = folder.join(CLEAN_FOLDER);
        let mut markers = Vec::new();
        if !clean.is_dir() {
            return Ok(markers);
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&clean)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();
        for path in paths.into_iter().filter(|p| self.is_sync_file(p)) {
            let node = self.load(&path)?;
            if node.empty_action() == Some(EmptyAction::Clean) {
                markers.push((path, node));
            }
        }
        Ok(markers)
    }

    /// Finds the file holding the item with `key`.
    pub fn find_by_key(&self, folder: &Path, key: Uuid) -> BackOfficeResult<Option<PathBuf>> {
        for path in self.files(folder)? {
            if self.load(&path).ok().and_then(|n| n.key().ok()) == Some(key) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Deletes item files whose key is not in `keep`.
    ///
    /// Tombstones and files that cannot be read are left alone.
    pub fn remove_orphans(&self, folder: &Path, keep: &HashSet<Uuid>) -> BackOfficeResult<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in self.files(folder)? {
            let Ok(node) = self.load(&path) else {
                continue;
            };
            if node.is_empty_item() {
                continue;
            }
            if let Ok(key) = node.key() {
                if !keep.contains(&key) {
                    debug!(path = %path.display(), "removing orphaned file");
                    self.delete(&path)?;
                    removed.push(path);
                }
            }
        }
        Ok(removed)
    }

    /// Writes the folder version file.
    pub fn write_version(&self, root: &Path, product_version: &str) -> BackOfficeResult<()> {
        self.save(&root.join(VERSION_FILE), &version_element(product_version))
    }

    /// Checks the folder version file; `None` when there is none.
    pub fn check_version(&self, root: &Path) -> BackOfficeResult<Option<FormatCheck>> {
        let path = root.join(VERSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(format_of(&self.load(&path)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn node(key: Uuid, alias: &str) -> XElement {
        XElement::new("DataType")
            .with_attr("Key", key.to_string())
            .with_attr("Alias", alias)
    }

    #[test]
    fn safe_names() {
        assert_eq!(safe_file_name("Home Page"), "home page");
        assert_eq!(safe_file_name("a/b:c"), "a_b_c");
        assert_eq!(safe_file_name("  ..  "), "_");
    }

    #[test]
    fn flat_nested_and_guid_paths() {
        let store = SyncFileStore::default();
        let folder = Path::new("root/Content");
        let key = Uuid::new_v4();
        let ancestors = vec!["Home".to_string()];

        let flat = store.item_path(folder, key, "About", &ancestors, &HandlerSettings::default());
        assert_eq!(flat, folder.join("about.config"));

        let nested = HandlerSettings::default().with_nested_structure();
        assert_eq!(
            store.item_path(folder, key, "About", &ancestors, &nested),
            folder.join("home").join("about.config")
        );

        let guid = HandlerSettings::default().with_guid_names();
        assert_eq!(
            store.item_path(folder, key, "About", &ancestors, &guid),
            folder.join(format!("{key}.config"))
        );
    }

    #[test]
    fn keyed_path_keeps_folder_and_extension() {
        let store = SyncFileStore::new(".xml");
        let key = Uuid::new_v4();
        let path = Path::new("root/Content/about.xml");
        assert_eq!(
            store.keyed_path(path, key),
            Path::new("root/Content").join(format!("about_{key}.xml"))
        );
    }

    #[test]
    fn save_load_and_list() {
        let dir = tempdir().unwrap();
        let store = SyncFileStore::default();
        let key = Uuid::new_v4();
        let path = dir.path().join("DataTypes").join("nested").join("text.config");

        store.save(&path, &node(key, "Text")).unwrap();
        let marker = XElement::empty(EmptyAction::Clean, "", Uuid::nil());
        store
            .save(&store.clean_path(&dir.path().join("DataTypes"), Uuid::nil()), &marker)
            .unwrap();

        assert_eq!(store.load(&path).unwrap().alias(), "Text");
        let files = store.files(&dir.path().join("DataTypes")).unwrap();
        assert_eq!(files, vec![path.clone()]);
        assert_eq!(store.clean_markers(&dir.path().join("DataTypes")).unwrap().len(), 1);
        assert_eq!(store.find_by_key(dir.path(), key).unwrap(), Some(path));
        assert!(store.files(&dir.path().join("Missing")).unwrap().is_empty());
    }

    #[test]
    fn orphans_are_removed_but_tombstones_stay() {
        let dir = tempdir().unwrap();
        let store = SyncFileStore::default();
        let (kept, orphan, deleted) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.save(&dir.path().join("kept.config"), &node(kept, "kept")).unwrap();
        store.save(&dir.path().join("orphan.config"), &node(orphan, "orphan")).unwrap();
        store
            .save(&dir.path().join("gone.config"), &XElement::empty(EmptyAction::Delete, "gone", deleted))
            .unwrap();

        let removed = store.remove_orphans(dir.path(), &HashSet::from([kept])).unwrap();
        assert_eq!(removed, vec![dir.path().join("orphan.config")]);
        assert_eq!(store.files(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn version_file() {
        let dir = tempdir().unwrap();
        let store = SyncFileStore::default();
        assert_eq!(store.check_version(dir.path()).unwrap(), None);
        store.write_version(dir.path(), "10.7.1").unwrap();
        assert_eq!(store.check_version(dir.path()).unwrap(), Some(FormatCheck::Current));
        assert!(store.files(dir.path()).unwrap().is_empty());
    }
}
