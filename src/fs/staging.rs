//! Staging files for in-place updates.
//!
//! An update never writes to the file it updates. New content goes to a
//! hidden sibling (`.{filename}.temp`) which replaces the original on commit.
//!
//! # Commit Strategy
//!
//! 1. Flush and sync the staging file (fsync)
//! 2. Close it
//! 3. Move it over the original, according to [`ReplaceMode`]:
//!    - `Rename`: a single `rename()`, atomic when source and destination are
//!      on the same filesystem
//!    - `RemoveThenRename`: remove the original, then `rename()`. If the
//!      rename fails the original is already gone; this is reported as
//!      [`FileError::CommitLost`] and the staging file is left in place as the
//!      only copy of the data
//! 4. Sync the parent directory so the new directory entry is persisted

use super::ops::{Filesystem, remove_if_exists};
use super::paths::temp_file_path;
use crate::config::ReplaceMode;
use crate::error::{FileError, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A staging file owned exclusively by one update.
#[derive(Debug)]
pub struct StagingFile {
    fs: Arc<dyn Filesystem>,

    /// Path of the staging file.
    path: PathBuf,

    /// Open stream, `None` once closed.
    file: Option<File>,

    /// Whether the staging file has been renamed away or removed.
    finished: bool,
}

impl StagingFile {
    /// Create the staging file for `target` exclusively.
    ///
    /// # Returns
    ///
    /// * `Ok(StagingFile)` - The staging file exists and is open for writing
    /// * `Err(FileError::Lock)` - The path is empty or a staging file already exists
    pub fn create(fs: Arc<dyn Filesystem>, target: &Path) -> Result<Self> {
        let path = temp_file_path(target)?;

        let file = fs.create_new(&path).map_err(|e| {
            FileError::Lock(format!(
                "unable to create temporary file for \"{}\": {}",
                target.display(),
                e
            ))
        })?;

        tracing::trace!(path = %path.display(), "created staging file");
        Ok(Self {
            fs,
            path,
            file: Some(file),
            finished: false,
        })
    }

    /// Path of the staging file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open stream, for writing new content.
    pub fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::other(format!(
                "temporary file {} is already closed",
                self.path.display()
            ))
        })
    }

    /// Move the staged content over `original`.
    ///
    /// Returns `FileError::CommitLost` when the original was removed but the
    /// staged file could not be moved into place; no retry is attempted.
    pub fn commit_over(&mut self, original: &Path, mode: ReplaceMode) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        if let Some(mut file) = self.file.take() {
            self.fs.sync_file(&self.path, &mut file).map_err(|e| {
                FileError::stream(
                    format!("failed to sync temporary file {}", self.path.display()),
                    e,
                )
            })?;
        }

        let removed = match mode {
            ReplaceMode::Rename => false,
            ReplaceMode::RemoveThenRename => {
                if self.fs.exists(original) {
                    self.fs.remove_file(original).map_err(|e| {
                        FileError::stream(
                            format!("failed to remove {} before replacing it", original.display()),
                            e,
                        )
                    })?;
                    true
                } else {
                    false
                }
            }
        };

        if let Err(e) = self.fs.rename(&self.path, original) {
            if removed {
                tracing::error!(
                    path = %original.display(),
                    staged = %self.path.display(),
                    error = %e,
                    "original removed but staged content could not be moved into place"
                );
                // The staged content is now the only copy.
                self.retain_on_disk();
                return Err(FileError::CommitLost {
                    path: original.to_path_buf(),
                    staged: self.path.clone(),
                    source: e,
                });
            }
            return Err(FileError::stream(
                format!("failed to replace {}", original.display()),
                e,
            ));
        }
        self.finished = true;

        if let Some(parent) = original.parent()
            && let Err(e) = self.fs.sync_dir(parent)
        {
            tracing::debug!(dir = %parent.display(), error = %e, "directory sync failed");
        }

        Ok(())
    }

    /// Close and remove the staging file.
    ///
    /// Safe to call more than once.
    pub fn discard(&mut self) -> Result<()> {
        self.file = None;
        if self.finished {
            return Ok(());
        }

        remove_if_exists(self.fs.as_ref(), &self.path).map_err(|e| {
            FileError::stream(
                format!("failed to remove temporary file {}", self.path.display()),
                e,
            )
        })?;
        self.finished = true;
        Ok(())
    }

    /// Close the stream but keep the staging file on disk.
    ///
    /// Used when the staging file is the only remaining copy of the data.
    pub fn retain_on_disk(&mut self) {
        self.file = None;
        self.finished = true;
    }
}
