//! Resource handles: one open attempt on one file.
//!
//! A handle is created by exactly one of three constructors (read, create,
//! update), gives access to the file's streams while open, and terminates
//! exactly once through `commit` or `close`. Both are no-ops afterwards.
//!
//! ```text
//! Opening -> Open -> Committed
//!                 \-> Aborted
//! ```
//!
//! The handle's state sits behind a mutex shared with the process-local
//! registry, so bulk teardown can close it from another thread (an interrupt
//! handler) while its owner is blocked elsewhere.

mod finish;
mod open;
mod stream;


pub use stream::{ReadStream, WriteStream};
pub(crate) use open::OpenContext;

use crate::config::ReplaceMode;
use crate::error::Result;
use crate::fs::{Filesystem, StagingFile};
use crate::locks::LockFile;
use crate::registry::Registry;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpenMode {
    /// Read an existing file once no writer holds it.
    Read,
    /// Create a file that must not exist yet.
    Create,
    /// Replace the content of an existing file through a staging file.
    Update,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Read => "read",
            OpenMode::Create => "create",
            OpenMode::Update => "update",
        }
    }

    /// Whether this mode takes the lock file and a registry slot.
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    Opening,
    Open,
    Committed,
    Aborted,
}

impl HandleStatus {
    /// `Committed` and `Aborted` never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandleStatus::Committed | HandleStatus::Aborted)
    }
}

pub(crate) type SharedState = Arc<Mutex<HandleState>>;

/// Everything a handle exclusively owns.
#[derive(Debug)]
pub(crate) struct HandleState {
    pub(crate) id: u64,
    pub(crate) path: PathBuf,
    pub(crate) mode: OpenMode,
    fs: Arc<dyn Filesystem>,
    replace_mode: ReplaceMode,

    /// The real file: read-only for read/update, read-write for create.
    file: Option<File>,

    /// The update's "after" view. Update mode only.
    staging: Option<StagingFile>,

    /// The sentinel. Create and update modes only.
    lock: Option<LockFile>,

    status: HandleStatus,
}

impl HandleState {
    pub(crate) fn new(
        id: u64,
        path: &Path,
        mode: OpenMode,
        fs: Arc<dyn Filesystem>,
        replace_mode: ReplaceMode,
    ) -> Self {
        Self {
            id,
            path: path.to_path_buf(),
            mode,
            fs,
            replace_mode,
            file: None,
            staging: None,
            lock: None,
            status: HandleStatus::Opening,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}

pub(crate) fn lock_state(state: &SharedState) -> MutexGuard<'_, HandleState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// An open file under one of the access policies.
///
/// Dropping a handle that is still open aborts it, as `close` would.
pub struct ResourceHandle {
    state: SharedState,
    registry: Arc<Registry>,
    id: u64,
    path: PathBuf,
    mode: OpenMode,
}

impl ResourceHandle {
    /// The path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn status(&self) -> HandleStatus {
        lock_state(&self.state).status
    }

    /// Whether the handle has been committed or closed (possibly by bulk teardown).
    pub fn is_closed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Stream over the real file's current content (all modes).
    pub fn file_for_read(&self) -> Result<ReadStream<'_>> {
        ReadStream::new(&self.state)
    }

    /// Stream receiving new content.
    ///
    /// Update mode writes to the staging file; create mode writes to the new
    /// file directly, since there is nothing yet to protect. Read handles are
    /// not writable.
    pub fn file_for_write(&self) -> Result<WriteStream<'_>> {
        WriteStream::new(&self.state)
    }

    /// Make the handle's changes durable and release it.
    ///
    /// Update: the staging file replaces the real file. Create: the new file
    /// is synced and kept. The lock file is released last. Returns the first
    /// error; the handle is closed and unregistered either way.
    pub fn commit(&mut self) -> Result<()> {
        let result = lock_state(&self.state).commit();
        self.registry.unregister(self.mode, &self.path, self.id);
        result
    }

    /// Abort: discard every change and release the handle.
    ///
    /// Create: the new file is deleted. Update: the staging file is deleted
    /// and the real file is untouched. Stops at the first failing step.
    pub fn close(&mut self) -> Result<()> {
        let result = lock_state(&self.state).close();
        self.registry.unregister(self.mode, &self.path, self.id);
        result
    }

    /// Abort like `close`, but attempt every cleanup step and report all failures.
    pub fn close_with_errors(&mut self) -> Result<()> {
        let result = lock_state(&self.state).close_with_errors();
        self.registry.unregister(self.mode, &self.path, self.id);
        result
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("status", &self.status())
            .finish()
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if self.is_closed() {
            self.registry.unregister(self.mode, &self.path, self.id);
            return;
        }
        if let Err(e) = self.close_with_errors() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to clean up handle dropped without commit"
            );
        }
    }
}
