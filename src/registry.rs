//! Process-local registry of open handles.
//!
//! The lock file keeps other processes out, but it cannot stop this process
//! from opening the same path twice: the second attempt would just see its
//! own lock. The registry catches that case, and it is how bulk teardown
//! finds every handle still open when the process has to stop.
//!
//! Create and update handles hold an exclusive slot keyed by the case-folded
//! path. Read handles are tracked by id only, so any number of them may be
//! open for the same path.
//!
//! Opens in progress are counted separately. Teardown cannot undo an open
//! that is still acquiring: it marks the handle aborted and the opener backs
//! out on its own thread. `wait_for_pending_opens` lets a shutdown path wait
//! for that before the process exits.
//!
//! Lock order: the registry's maps are never locked while a handle's state is
//! locked by the same thread in the other order. Teardown snapshots the maps,
//! releases them, then closes handles one by one.

use crate::error::{FileError, Result};
use crate::fs::paths::registry_key;
use crate::handle::{OpenMode, SharedState, lock_state};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    path: PathBuf,
    mode: OpenMode,
    state: SharedState,
}

/// Handles currently open in this process.
#[derive(Debug, Default)]
pub struct Registry {
    exclusive: Mutex<HashMap<String, Entry>>,
    readers: Mutex<HashMap<u64, Entry>>,
    pending_opens: Mutex<usize>,
    opens_settled: Condvar,
}

/// An open in progress. Dropping it marks the open finished.
pub(crate) struct PendingOpen<'a> {
    registry: &'a Registry,
}

impl Drop for PendingOpen<'_> {
    fn drop(&mut self) {
        let mut pending = guard(&self.registry.pending_opens);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.registry.opens_settled.notify_all();
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the exclusive slot for `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The slot is now held by handle `id`
    /// * `Err(FileError::AlreadyOpened)` - Another live handle holds it
    pub(crate) fn reserve(
        &self,
        id: u64,
        path: &Path,
        mode: OpenMode,
        state: &SharedState,
    ) -> Result<()> {
        let key = registry_key(path);
        let mut exclusive = guard(&self.exclusive);
        if exclusive.contains_key(&key) {
            return Err(FileError::AlreadyOpened {
                path: path.to_path_buf(),
            });
        }
        exclusive.insert(
            key,
            Entry {
                id,
                path: path.to_path_buf(),
                mode,
                state: state.clone(),
            },
        );
        Ok(())
    }

    /// Count a create or update open until the returned guard drops.
    ///
    /// The guard must outlive every cleanup the opener performs.
    pub(crate) fn begin_open(&self) -> PendingOpen<'_> {
        *guard(&self.pending_opens) += 1;
        PendingOpen { registry: self }
    }

    /// Block until no create or update open is in progress, or `timeout` passes.
    ///
    /// Returns `true` if every open finished (successfully or not).
    pub fn wait_for_pending_opens(&self, timeout: Duration) -> bool {
        let pending = guard(&self.pending_opens);
        let (pending, _) = self
            .opens_settled
            .wait_timeout_while(pending, timeout, |pending| *pending > 0)
            .unwrap_or_else(|poison| poison.into_inner());
        *pending == 0
    }

    /// Track a read handle so teardown can reach it.
    pub(crate) fn track_read(&self, id: u64, path: &Path, state: &SharedState) {
        guard(&self.readers).insert(
            id,
            Entry {
                id,
                path: path.to_path_buf(),
                mode: OpenMode::Read,
                state: state.clone(),
            },
        );
    }

    /// Forget handle `id`. Idempotent; never removes another handle's slot.
    pub(crate) fn unregister(&self, mode: OpenMode, path: &Path, id: u64) {
        if mode.is_exclusive() {
            let key = registry_key(path);
            let mut exclusive = guard(&self.exclusive);
            if exclusive.get(&key).is_some_and(|entry| entry.id == id) {
                exclusive.remove(&key);
            }
        } else {
            guard(&self.readers).remove(&id);
        }
    }

    /// Number of open handles, readers included.
    pub fn len(&self) -> usize {
        guard(&self.exclusive).len() + guard(&self.readers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of all open handles with their modes, sorted by path.
    pub fn open_paths(&self) -> Vec<(PathBuf, OpenMode)> {
        let mut paths: Vec<(PathBuf, OpenMode)> = self
            .snapshot()
            .into_iter()
            .map(|entry| (entry.path, entry.mode))
            .collect();
        paths.sort();
        paths
    }

    /// Abort every open handle, stopping at the first failure.
    ///
    /// The failing handle is still unregistered; handles after it stay open.
    pub fn force_release_all(&self) -> Result<()> {
        for entry in self.snapshot() {
            let result = lock_state(&entry.state).close();
            self.unregister(entry.mode, &entry.path, entry.id);
            result?;
        }
        Ok(())
    }

    /// Abort every open handle, attempting every cleanup step of every handle.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Everything was released
    /// * `Err(FileError::Aggregate)` - Every failure encountered, flattened
    pub fn force_release_all_with_errors(&self) -> Result<()> {
        let mut errors = Vec::new();
        for entry in self.snapshot() {
            if let Err(e) = lock_state(&entry.state).close_with_errors() {
                tracing::warn!(
                    path = %entry.path.display(),
                    mode = %entry.mode,
                    error = %e,
                    "forced release failed"
                );
                errors.extend(e.into_errors());
            }
            self.unregister(entry.mode, &entry.path, entry.id);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FileError::Aggregate(errors))
        }
    }

    /// Writers first, then readers, each in path order.
    fn snapshot(&self) -> Vec<Entry> {
        let mut writers: Vec<Entry> = guard(&self.exclusive).values().cloned().collect();
        writers.sort_by(|a, b| a.path.cmp(&b.path));
        let mut readers: Vec<Entry> = guard(&self.readers).values().cloned().collect();
        readers.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));
        writers.extend(readers);
        writers
    }
}

fn guard<T>(value: &Mutex<T>) -> MutexGuard<'_, T> {
    value.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplaceMode;
    use crate::fs::OsFilesystem;
    use crate::handle::HandleState;
    use std::sync::{Arc, Mutex};

    fn state(id: u64, path: &str, mode: OpenMode) -> SharedState {
        Arc::new(Mutex::new(HandleState::new(
            id,
            Path::new(path),
            mode,
            Arc::new(OsFilesystem),
            ReplaceMode::Rename,
        )))
    }

    #[test]
    fn test_reserve_rejects_second_writer() {
        let registry = Registry::new();
        let first = state(1, "/data/a.txt", OpenMode::Update);
        let second = state(2, "/data/A.TXT", OpenMode::Create);

        registry
            .reserve(1, Path::new("/data/a.txt"), OpenMode::Update, &first)
            .unwrap();
        let err = registry
            .reserve(2, Path::new("/data/A.TXT"), OpenMode::Create, &second)
            .unwrap_err();

        assert!(matches!(err, FileError::AlreadyOpened { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_only_removes_own_slot() {
        let registry = Registry::new();
        let path = Path::new("/data/a.txt");
        let owner = state(1, "/data/a.txt", OpenMode::Update);
        registry.reserve(1, path, OpenMode::Update, &owner).unwrap();

        // A failed duplicate open cleaning up must not free the owner's slot.
        registry.unregister(OpenMode::Update, path, 2);
        assert_eq!(registry.len(), 1);

        registry.unregister(OpenMode::Update, path, 1);
        registry.unregister(OpenMode::Update, path, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_readers_do_not_collide() {
        let registry = Registry::new();
        let path = Path::new("/data/a.txt");
        let writer = state(1, "/data/a.txt", OpenMode::Update);
        registry.reserve(1, path, OpenMode::Update, &writer).unwrap();

        registry.track_read(2, path, &state(2, "/data/a.txt", OpenMode::Read));
        registry.track_read(3, path, &state(3, "/data/a.txt", OpenMode::Read));
        assert_eq!(registry.len(), 3);

        registry.unregister(OpenMode::Read, path, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_open_paths_sorted() {
        let registry = Registry::new();
        let b = state(1, "/data/b.txt", OpenMode::Create);
        registry
            .reserve(1, Path::new("/data/b.txt"), OpenMode::Create, &b)
            .unwrap();
        registry.track_read(2, Path::new("/data/a.txt"), &state(2, "/data/a.txt", OpenMode::Read));

        assert_eq!(
            registry.open_paths(),
            vec![
                (PathBuf::from("/data/a.txt"), OpenMode::Read),
                (PathBuf::from("/data/b.txt"), OpenMode::Create),
            ]
        );
    }

    #[test]
    fn test_teardown_marks_opening_handles_aborted() {
        let registry = Registry::new();
        let path = Path::new("/nonexistent/ftx-registry-test/a.txt");
        let opening = state(1, "/nonexistent/ftx-registry-test/a.txt", OpenMode::Create);
        registry.reserve(1, path, OpenMode::Create, &opening).unwrap();

        registry.force_release_all_with_errors().unwrap();

        assert!(lock_state(&opening).is_closed());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_pending_opens_settle_when_guards_drop() {
        let registry = Arc::new(Registry::new());
        assert!(registry.wait_for_pending_opens(Duration::ZERO));

        let opener = registry.clone();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            let _pending = opener.begin_open();
            started_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(100));
        });

        started_rx.recv().unwrap();
        assert!(!registry.wait_for_pending_opens(Duration::from_millis(10)));
        assert!(registry.wait_for_pending_opens(Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
