//! CLI command implementations.

pub mod config;
pub mod diff;
pub mod inspect;
pub mod verify;

use std::fs;
use std::path::{Path, PathBuf};
use usync_backoffice::{CLEAN_FOLDER, HISTORY_FOLDER};

/// Handler folders directly under a sync root, sorted by name.
pub(crate) fn handler_folders(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_dir() && name != HISTORY_FOLDER && name != CLEAN_FOLDER {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}
