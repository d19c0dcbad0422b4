//! The sentinel lock file.

use super::metadata::LockMetadata;
use crate::error::{FileError, Result};
use crate::fs::{Filesystem, lock_file_path, remove_if_exists};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A held lock file.
///
/// The lock file exists on disk for as long as this value is held and not
/// released. When dropped, the lock file is automatically deleted. If
/// deletion fails, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockFile {
    fs: Arc<dyn Filesystem>,

    /// Path to the lock file.
    path: PathBuf,

    /// Open stream to the lock file.
    file: Option<File>,

    /// Whether the lock has been released (or deliberately left on disk).
    released: bool,
}

impl LockFile {
    /// Create the lock file for `target` using create_new semantics.
    ///
    /// This is a single, non-blocking attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(LockFile)` - Successfully acquired lock
    /// * `Err(FileError::Lock)` - Lock already exists, or the path is empty
    pub fn try_acquire(
        fs: Arc<dyn Filesystem>,
        target: &Path,
        metadata: &LockMetadata,
    ) -> Result<Self> {
        let lock_path = lock_file_path(target)?;

        let mut file = fs.create_new(&lock_path).map_err(|e| {
            FileError::Lock(format!(
                "unable to create lock file for \"{}\": {}",
                target.display(),
                e
            ))
        })?;

        let written = metadata.to_json().and_then(|json| {
            file.write_all(json.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| FileError::stream("failed to write lock metadata", e))
        });
        if let Err(e) = written {
            // Clean up the lock file on write failure
            drop(file);
            let _ = remove_if_exists(fs.as_ref(), &lock_path);
            return Err(e);
        }

        tracing::debug!(lock = %lock_path.display(), "acquired lock file");
        Ok(Self {
            fs,
            path: lock_path,
            file: Some(file),
            released: false,
        })
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close and remove the lock file.
    ///
    /// Safe to call more than once, and safe if the lock file has already been
    /// removed by someone else.
    pub fn release(&mut self) -> Result<()> {
        self.file = None;
        if self.released {
            return Ok(());
        }

        remove_if_exists(self.fs.as_ref(), &self.path).map_err(|e| {
            FileError::stream(
                format!("failed to release lock '{}'", self.path.display()),
                e,
            )
        })?;
        self.released = true;
        tracing::debug!(lock = %self.path.display(), "released lock file");
        Ok(())
    }

    /// Close the stream but leave the lock file on disk.
    ///
    /// Keeps other processes away from a resource that needs manual recovery.
    pub fn retain_on_disk(&mut self) {
        self.file = None;
        self.released = true;
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.release()
        {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// Whether a lock file currently exists for `target`.
///
/// Readers use this to wait for writers; it never acquires anything.
pub fn is_held(fs: &dyn Filesystem, target: &Path) -> bool {
    match lock_file_path(target) {
        Ok(lock_path) => fs.exists(&lock_path),
        Err(_) => false,
    }
}
