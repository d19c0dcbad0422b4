//! Commit and abort.

use super::{HandleState, HandleStatus, OpenMode};
use crate::error::{FileError, Result};

impl HandleState {
    pub(crate) fn commit(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        if let Err(err) = self.commit_data() {
            self.abandon_failed_commit(&err);
            self.status = HandleStatus::Aborted;
            return Err(err);
        }

        // The content is durable; nothing after this point may undo it.
        self.status = HandleStatus::Committed;
        tracing::debug!(path = %self.path.display(), mode = %self.mode, "committed");
        self.release_committed_lock()
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        if self.is_closed() || self.abort_unopened() {
            return Ok(());
        }

        let result = match self.rollback(false).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        self.status = HandleStatus::Aborted;
        tracing::debug!(path = %self.path.display(), mode = %self.mode, "closed without commit");
        result
    }

    pub(crate) fn close_with_errors(&mut self) -> Result<()> {
        if self.is_closed() || self.abort_unopened() {
            return Ok(());
        }

        let errors = self.rollback(true);
        self.status = HandleStatus::Aborted;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FileError::Aggregate(errors))
        }
    }

    /// A handle still opening owns nothing yet; mark it so the opener backs out.
    fn abort_unopened(&mut self) -> bool {
        if self.status != HandleStatus::Opening {
            return false;
        }
        self.status = HandleStatus::Aborted;
        true
    }

    fn commit_data(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take()
            && self.mode == OpenMode::Create
        {
            self.fs.sync_file(&self.path, &mut file).map_err(|e| {
                FileError::stream(format!("failed to sync {}", self.path.display()), e)
            })?;
        }

        if let Some(staging) = self.staging.as_mut() {
            match self.mode {
                OpenMode::Update => staging.commit_over(&self.path, self.replace_mode)?,
                _ => staging.discard()?,
            }
        }
        self.staging = None;
        Ok(())
    }

    /// Release the lock of a handle whose content is already in place.
    ///
    /// On failure the lock file stays on disk and the error is returned; the
    /// committed content is kept and `lock clear` removes the leftover lock.
    fn release_committed_lock(&mut self) -> Result<()> {
        let Some(mut lock) = self.lock.take() else {
            return Ok(());
        };
        lock.release().inspect_err(|e| {
            lock.retain_on_disk();
            tracing::error!(
                path = %self.path.display(),
                lock = %lock.path().display(),
                error = %e,
                "committed, but the lock file could not be removed"
            );
        })
    }

    /// Clean up after a commit that did not complete.
    ///
    /// If the original was lost, the staging file holds the only copy and the
    /// lock file stays so no other process touches the resource until it is
    /// recovered. Otherwise the attempt is rolled back.
    fn abandon_failed_commit(&mut self, err: &FileError) {
        if matches!(err, FileError::CommitLost { .. }) {
            if let Some(lock) = self.lock.as_mut() {
                lock.retain_on_disk();
            }
            self.lock = None;
            self.staging = None;
            return;
        }

        for cleanup_err in self.rollback(true) {
            tracing::warn!(
                path = %self.path.display(),
                error = %cleanup_err,
                "cleanup after failed commit"
            );
        }
    }

    /// Undo everything this handle did, in acquisition order reversed.
    ///
    /// With `keep_going` every step runs and every failure is returned;
    /// otherwise the first failure stops the sequence.
    fn rollback(&mut self, keep_going: bool) -> Vec<FileError> {
        let mut errors = Vec::new();

        self.file = None;

        if self.mode == OpenMode::Create
            && self.fs.exists(&self.path)
            && let Err(e) = self.fs.remove_file(&self.path)
        {
            errors.push(FileError::stream(
                format!("failed to remove {}", self.path.display()),
                e,
            ));
            if !keep_going {
                return errors;
            }
        }

        if let Some(staging) = self.staging.as_mut() {
            if let Err(e) = staging.discard() {
                errors.push(e);
                if !keep_going {
                    return errors;
                }
            } else {
                self.staging = None;
            }
        }

        if let Some(lock) = self.lock.as_mut() {
            if let Err(e) = lock.release() {
                errors.push(e);
            } else {
                self.lock = None;
            }
        }

        errors
    }
}
