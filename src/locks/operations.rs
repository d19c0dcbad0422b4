//! Lock listing and clearing operations.
//!
//! These are recovery tools for lock files left behind by processes that
//! were killed before they could clean up.

use super::metadata::{LockMetadata, is_stale_since};
use super::types::{ClearedLock, LockInfo, StagingOutcome};
use crate::config::Config;
use crate::error::{FileError, Result};
use crate::fs::paths::target_of_lock_file;
use crate::fs::{LOCK_FILE_SUFFIX, lock_file_path, temp_file_path};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// List all lock files in a directory.
///
/// # Arguments
///
/// * `dir` - Directory holding the guarded files
/// * `config` - Configuration (for the stale threshold)
///
/// # Returns
///
/// A vector of `LockInfo` for every `.{name}.lock` file, sorted by target.
pub fn list_locks(dir: &Path, config: &Config) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        FileError::stream(format!("failed to read directory '{}'", dir.display()), e)
    })?;

    for entry in entries {
        let entry = entry
            .map_err(|e| FileError::stream("failed to read directory entry", e))?;

        let path = entry.path();

        // Skip anything that is not a sentinel
        let is_lock = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') && n.ends_with(LOCK_FILE_SUFFIX));
        if !is_lock || !path.is_file() {
            continue;
        }

        let Some(target) = target_of_lock_file(&path) else {
            continue;
        };

        locks.push(inspect_lock(&path, &target, config));
    }

    // Sort by target for consistent output
    locks.sort_by(|a, b| a.target.cmp(&b.target));

    Ok(locks)
}

/// Forcibly clear the lock guarding `target`.
///
/// The caller is responsible for verifying that clearing the lock is
/// appropriate (the holder has crashed). A leftover staging file is restored
/// into place if the target is missing (a commit died between removing the
/// original and renaming), otherwise it is deleted.
///
/// # Returns
///
/// * `Ok(ClearedLock)` - Information about the cleared lock (for audit purposes)
/// * `Err(FileError::Io)` - No lock file exists for `target`
pub fn clear_lock(target: &Path, config: &Config) -> Result<ClearedLock> {
    let lock_path = lock_file_path(target)?;

    if !lock_path.exists() {
        return Err(FileError::Io(format!(
            "lock for '{}' does not exist at: {}",
            target.display(),
            lock_path.display()
        )));
    }

    let info = inspect_lock(&lock_path, target, config);

    let staging_path = temp_file_path(target)?;
    let staging = if !staging_path.exists() {
        StagingOutcome::None
    } else if target.exists() {
        fs::remove_file(&staging_path).map_err(|e| {
            FileError::stream(
                format!("failed to remove temporary file '{}'", staging_path.display()),
                e,
            )
        })?;
        StagingOutcome::Discarded
    } else {
        fs::rename(&staging_path, target).map_err(|e| {
            FileError::stream(
                format!(
                    "failed to restore '{}' from '{}'",
                    target.display(),
                    staging_path.display()
                ),
                e,
            )
        })?;
        StagingOutcome::Restored
    };

    fs::remove_file(&lock_path).map_err(|e| {
        FileError::stream(format!("failed to clear lock '{}'", lock_path.display()), e)
    })?;

    tracing::info!(
        lock = %lock_path.display(),
        staging = ?staging,
        "cleared lock"
    );
    Ok(ClearedLock { info, staging })
}

fn inspect_lock(lock_path: &Path, target: &Path, config: &Config) -> LockInfo {
    // Empty or foreign lock files carry no metadata; fall back to the mtime.
    let metadata = LockMetadata::from_file(lock_path).ok();
    let created_at = match &metadata {
        Some(meta) => Some(meta.created_at),
        None => fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from),
    };
    let is_stale = created_at.is_some_and(|t| is_stale_since(t, config.lock_stale_minutes));
    let has_staging_file = temp_file_path(target).is_ok_and(|p| p.exists());

    LockInfo {
        path: lock_path.to_path_buf(),
        target: target.to_path_buf(),
        metadata,
        created_at,
        has_staging_file,
        is_stale,
    }
}
