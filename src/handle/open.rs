//! Handle construction for each access mode.
//!
//! No partially built handle is ever returned: if a step fails, whatever was
//! acquired before it (lock file, staging file, new file, registry slot) is
//! released before the error is returned.

use super::{HandleState, HandleStatus, OpenMode, ResourceHandle, SharedState, lock_state};
use crate::cancel::CancelToken;
use crate::config::ReplaceMode;
use crate::error::{FileError, Result};
use crate::fs::{Filesystem, StagingFile};
use crate::locks::{self, LockFile, LockMetadata, WaitPolicy};
use crate::registry::Registry;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// What a constructor needs from the owning `FileAccess`.
pub(crate) struct OpenContext<'a> {
    pub(crate) fs: &'a Arc<dyn Filesystem>,
    pub(crate) registry: &'a Arc<Registry>,
    pub(crate) policy: WaitPolicy,
    pub(crate) replace_mode: ReplaceMode,
}

impl OpenContext<'_> {
    fn new_state(&self, path: &Path, mode: OpenMode) -> (u64, SharedState) {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let state = HandleState::new(id, path, mode, self.fs.clone(), self.replace_mode);
        (id, Arc::new(Mutex::new(state)))
    }

    fn handle(&self, id: u64, path: &Path, mode: OpenMode, state: SharedState) -> ResourceHandle {
        ResourceHandle {
            state,
            registry: self.registry.clone(),
            id,
            path: path.to_path_buf(),
            mode,
        }
    }
}

impl ResourceHandle {
    /// Open an existing file for reading once no writer holds its lock.
    pub(crate) fn open_for_read(
        ctx: &OpenContext<'_>,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Self> {
        require_exists(ctx.fs.as_ref(), path)?;
        locks::wait_for_release(ctx.fs.as_ref(), path, &ctx.policy, cancel)?;

        let file = ctx
            .fs
            .open_read(path)
            .map_err(|e| open_error(path, e))?;

        let (id, state) = ctx.new_state(path, OpenMode::Read);
        {
            let mut guard = lock_state(&state);
            guard.file = Some(file);
            guard.status = HandleStatus::Open;
        }
        ctx.registry.track_read(id, path, &state);

        tracing::debug!(path = %path.display(), "opened for read");
        Ok(ctx.handle(id, path, OpenMode::Read, state))
    }

    /// Create a new file, failing immediately if another holder has its lock.
    pub(crate) fn open_for_create(ctx: &OpenContext<'_>, path: &Path) -> Result<Self> {
        let _pending = ctx.registry.begin_open();
        let (id, state) = ctx.new_state(path, OpenMode::Create);
        ctx.registry.reserve(id, path, OpenMode::Create, &state)?;

        let acquired = (|| -> Result<Acquired> {
            if ctx.fs.exists(path) {
                return Err(already_exists(path));
            }

            let lock = LockFile::try_acquire(
                ctx.fs.clone(),
                path,
                &LockMetadata::new(OpenMode::Create.as_str()),
            )?;

            let file = ctx.fs.create_new(path).map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    already_exists(path)
                } else {
                    FileError::stream(format!("failed to create {}", path.display()), e)
                }
            })?;

            Ok(Acquired {
                lock,
                file,
                staging: None,
            })
        })();

        finish_open(ctx, id, path, OpenMode::Create, state, acquired)
    }

    /// Open an existing file for update, waiting while another holder has its lock.
    pub(crate) fn open_for_update(
        ctx: &OpenContext<'_>,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let _pending = ctx.registry.begin_open();
        let (id, state) = ctx.new_state(path, OpenMode::Update);
        ctx.registry.reserve(id, path, OpenMode::Update, &state)?;

        let acquired = (|| -> Result<Acquired> {
            require_exists(ctx.fs.as_ref(), path)?;

            let lock = locks::acquire_with_timeout(
                ctx.fs,
                path,
                &LockMetadata::new(OpenMode::Update.as_str()),
                &ctx.policy,
                cancel,
            )?;

            let file = ctx
                .fs
                .open_read(path)
                .map_err(|e| open_error(path, e))?;

            let staging = StagingFile::create(ctx.fs.clone(), path)?;

            Ok(Acquired {
                lock,
                file,
                staging: Some(staging),
            })
        })();

        finish_open(ctx, id, path, OpenMode::Update, state, acquired)
    }
}

/// Resources acquired by a successful open, not yet owned by a handle.
///
/// Dropping this releases the lock file (RAII); the staging file and a newly
/// created file are cleaned up by the handle's rollback.
struct Acquired {
    lock: LockFile,
    file: File,
    staging: Option<StagingFile>,
}

fn finish_open(
    ctx: &OpenContext<'_>,
    id: u64,
    path: &Path,
    mode: OpenMode,
    state: SharedState,
    acquired: Result<Acquired>,
) -> Result<ResourceHandle> {
    let acquired = match acquired {
        Ok(acquired) => acquired,
        Err(e) => {
            ctx.registry.unregister(mode, path, id);
            return Err(e);
        }
    };

    let mut guard = lock_state(&state);
    let force_released = guard.status != HandleStatus::Opening;

    guard.lock = Some(acquired.lock);
    guard.file = Some(acquired.file);
    guard.staging = acquired.staging;
    guard.status = HandleStatus::Open;

    if force_released {
        // Bulk teardown ran while we were acquiring; undo what we just got.
        if let Err(e) = guard.close_with_errors() {
            tracing::warn!(path = %path.display(), error = %e, "cleanup of interrupted open");
        }
        drop(guard);
        ctx.registry.unregister(mode, path, id);
        return Err(FileError::Cancelled(format!(
            "file {} was released while it was being opened",
            path.display()
        )));
    }
    drop(guard);

    tracing::debug!(path = %path.display(), mode = %mode, "opened");
    Ok(ctx.handle(id, path, mode, state))
}

fn require_exists(fs: &dyn Filesystem, path: &Path) -> Result<()> {
    if !fs.exists(path) {
        return Err(FileError::Io(format!(
            "file {} does not exist",
            path.display()
        )));
    }
    Ok(())
}

fn already_exists(path: &Path) -> FileError {
    FileError::Io(format!("file {} already exists", path.display()))
}

fn open_error(path: &Path, e: io::Error) -> FileError {
    if e.kind() == io::ErrorKind::NotFound {
        FileError::Io(format!("file {} does not exist", path.display()))
    } else {
        FileError::stream(format!("failed to open {}", path.display()), e)
    }
}
