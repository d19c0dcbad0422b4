//! The file access context.
//!
//! A [`FileAccess`] bundles what every handle needs: the wait policy derived
//! from [`Config`], the process-local [`Registry`], the [`Filesystem`] and
//! the session's [`CancelToken`]. It is constructed once at startup and
//! shared (usually as `Arc<FileAccess>`) by everything that opens files,
//! including the interrupt handler. Independent contexts share nothing, so
//! tests can run side by side with different timeouts.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::Result;
use crate::fs::{Filesystem, OsFilesystem};
use crate::handle::{OpenContext, OpenMode, ResourceHandle};
use crate::locks::WaitPolicy;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Entry point for opening files under the lock protocol.
#[derive(Debug)]
pub struct FileAccess {
    config: Config,
    policy: WaitPolicy,
    registry: Arc<Registry>,
    fs: Arc<dyn Filesystem>,
    cancel: CancelToken,
}

impl FileAccess {
    /// Create a context on the real filesystem.
    ///
    /// # Returns
    ///
    /// * `Ok(FileAccess)` - Ready to open files
    /// * `Err(FileError::Config)` - The config failed validation
    pub fn new(config: Config) -> Result<Self> {
        Self::with_filesystem(config, Arc::new(OsFilesystem))
    }

    /// Create a context on a custom filesystem implementation.
    pub fn with_filesystem(config: Config, fs: Arc<dyn Filesystem>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: config.wait_policy(),
            config,
            registry: Arc::new(Registry::new()),
            fs,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn wait_policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Token cancelling every wait started through [`FileAccess::open_for_read`]
    /// and [`FileAccess::open_for_update`].
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn open_context(&self) -> OpenContext<'_> {
        OpenContext {
            fs: &self.fs,
            registry: &self.registry,
            policy: self.policy,
            replace_mode: self.config.replace_mode,
        }
    }

    /// Open an existing file for reading.
    ///
    /// Waits (bounded) until no other holder has the file's lock.
    ///
    /// # Returns
    ///
    /// * `Err(FileError::Io)` - The file does not exist
    /// * `Err(FileError::Timeout)` - The lock stayed held for the whole wait
    /// * `Err(FileError::Cancelled)` - The session's token was cancelled
    pub fn open_for_read<P: AsRef<Path>>(&self, path: P) -> Result<ResourceHandle> {
        self.open_for_read_with(path, &self.cancel)
    }

    /// Like [`FileAccess::open_for_read`], waiting under a caller-supplied token.
    pub fn open_for_read_with<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: &CancelToken,
    ) -> Result<ResourceHandle> {
        ResourceHandle::open_for_read(&self.open_context(), path.as_ref(), cancel)
    }

    /// Create a new file.
    ///
    /// Makes a single attempt at the lock; never waits.
    ///
    /// # Returns
    ///
    /// * `Err(FileError::AlreadyOpened)` - The path is already open here
    /// * `Err(FileError::Io)` - The file already exists
    /// * `Err(FileError::Lock)` - Another process holds the lock
    pub fn open_for_create<P: AsRef<Path>>(&self, path: P) -> Result<ResourceHandle> {
        ResourceHandle::open_for_create(&self.open_context(), path.as_ref())
    }

    /// Open an existing file for update.
    ///
    /// Waits (bounded) for the lock. The handle reads the current content
    /// and writes new content to a staging file that replaces the original
    /// on commit.
    ///
    /// # Returns
    ///
    /// * `Err(FileError::AlreadyOpened)` - The path is already open here
    /// * `Err(FileError::Io)` - The file does not exist
    /// * `Err(FileError::Timeout)` - The lock stayed held for the whole wait
    /// * `Err(FileError::Lock)` - A staging file is left over from a crash
    pub fn open_for_update<P: AsRef<Path>>(&self, path: P) -> Result<ResourceHandle> {
        self.open_for_update_with(path, &self.cancel)
    }

    /// Like [`FileAccess::open_for_update`], waiting under a caller-supplied token.
    pub fn open_for_update_with<P: AsRef<Path>>(
        &self,
        path: P,
        cancel: &CancelToken,
    ) -> Result<ResourceHandle> {
        ResourceHandle::open_for_update(&self.open_context(), path.as_ref(), cancel)
    }

    /// Open `path` in the given mode.
    pub fn open<P: AsRef<Path>>(&self, path: P, mode: OpenMode) -> Result<ResourceHandle> {
        match mode {
            OpenMode::Read => self.open_for_read(path),
            OpenMode::Create => self.open_for_create(path),
            OpenMode::Update => self.open_for_update(path),
        }
    }

    /// Make a handle's changes durable. See [`ResourceHandle::commit`].
    pub fn commit(&self, handle: &mut ResourceHandle) -> Result<()> {
        handle.commit()
    }

    /// Discard a handle's changes. See [`ResourceHandle::close`].
    pub fn abort(&self, handle: &mut ResourceHandle) -> Result<()> {
        handle.close()
    }

    /// Abort every open handle, stopping at the first failure.
    pub fn force_release_all(&self) -> Result<()> {
        self.registry.force_release_all()
    }

    /// Abort every open handle and report every failure.
    pub fn force_release_all_with_errors(&self) -> Result<()> {
        self.registry.force_release_all_with_errors()
    }

    /// Wait until no create or update open is still acquiring. See
    /// [`Registry::wait_for_pending_opens`].
    pub fn wait_for_pending_opens(&self, timeout: Duration) -> bool {
        self.registry.wait_for_pending_opens(timeout)
    }

    /// Paths currently open through this context.
    pub fn open_paths(&self) -> Vec<(PathBuf, OpenMode)> {
        self.registry.open_paths()
    }

    /// Number of handles currently open through this context.
    pub fn open_count(&self) -> usize {
        self.registry.len()
    }
}
