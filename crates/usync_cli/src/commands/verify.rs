//! Verify command implementation.

use super::handler_folders;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use usync_backoffice::SyncFileStore;
use uuid::Uuid;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of files checked.
    pub files_checked: usize,
    /// Number of valid files.
    pub valid_files: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every sync file under `root`.
///
/// A file is valid when it parses and carries a `Key`. Two item files in the
/// same handler folder with the same key are reported as well.
pub fn verify(root: &Path, extension: &str) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    if !root.is_dir() {
        return Err(format!("No sync folder found at {}", root.display()).into());
    }

    let store = SyncFileStore::new(extension);
    let mut result = VerifyResult::default();

    for folder in handler_folders(root)? {
        let mut seen: HashMap<Uuid, PathBuf> = HashMap::new();
        for path in store.files(&folder)? {
            result.files_checked += 1;
            let node = match store.load(&path) {
                Ok(node) => node,
                Err(err) => {
                    result.errors.push(format!("{}: {err}", path.display()));
                    continue;
                }
            };
            let key = match node.key() {
                Ok(key) => key,
                Err(err) => {
                    result.errors.push(format!("{}: {err}", path.display()));
                    continue;
                }
            };
            if let Some(first) = seen.insert(key, path.clone()) {
                result.errors.push(format!(
                    "{}: key {key} is also used by {}",
                    path.display(),
                    first.display()
                ));
                continue;
            }
            result.valid_files += 1;
        }
    }

    Ok(result)
}

/// Runs the verify command.
pub fn run(root: &Path, extension: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying sync folder at {}", root.display());
    println!();

    let result = verify(root, extension)?;

    println!("Files checked: {}", result.files_checked);
    println!("Valid files:   {}", result.valid_files);

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  - {error}");
        }
    }

    println!();
    if result.is_ok() {
        println!("✓ Sync folder verification passed");
        Ok(())
    } else {
        println!("✗ Sync folder verification failed");
        Err("Verification failed".into())
    }
}
