//! Naming convention for sentinel and staging files.
//!
//! Every instance of the tool sharing a directory must derive the same names,
//! so these are fixed: for a target `dir/table1.csv` the lock file is
//! `dir/.table1.csv.lock` and the staging file is `dir/.table1.csv.temp`.

use crate::error::{FileError, Result};
use std::path::{Path, PathBuf};

/// Suffix of the sentinel file that marks a resource as busy.
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Suffix of the sibling file that receives an update's new content.
pub const TEMP_FILE_SUFFIX: &str = ".temp";

/// Path of the lock file guarding `target`.
pub fn lock_file_path(target: &Path) -> Result<PathBuf> {
    hidden_sibling(target, LOCK_FILE_SUFFIX)
}

/// Path of the staging file used while updating `target`.
pub fn temp_file_path(target: &Path) -> Result<PathBuf> {
    hidden_sibling(target, TEMP_FILE_SUFFIX)
}

/// Recover the target path from a lock file path, if it follows the convention.
pub fn target_of_lock_file(lock_path: &Path) -> Option<PathBuf> {
    let name = lock_path.file_name()?.to_str()?;
    let base = name.strip_prefix('.')?.strip_suffix(LOCK_FILE_SUFFIX)?;
    if base.is_empty() {
        return None;
    }
    Some(parent_of(lock_path).join(base))
}

/// Key under which `path` is tracked in the process-local registry.
///
/// Case-folded so that two spellings of one file on a case-insensitive
/// filesystem collide. On case-sensitive filesystems this can report a false
/// "already opened" for two distinct files differing only by case.
pub fn registry_key(path: &Path) -> String {
    path.to_string_lossy().to_uppercase()
}

fn hidden_sibling(target: &Path, suffix: &str) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| FileError::Lock("filename not specified".to_string()))?;

    let mut name = std::ffi::OsString::from(".");
    name.push(filename);
    name.push(suffix);
    Ok(parent_of(target).join(name))
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}
