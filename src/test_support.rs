//! Test doubles shared by the unit tests.

use crate::config::Config;
use crate::fs::{Filesystem, OsFilesystem};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// A real filesystem that can be told to fail or stall specific calls.
///
/// Removals and syncs fail for registered paths; renames fail for registered
/// destinations; exclusive creates of registered paths stall before they
/// touch the disk. Everything else goes to disk.
#[derive(Debug, Default)]
pub(crate) struct FaultyFs {
    fail_remove: Mutex<HashSet<PathBuf>>,
    fail_rename: Mutex<HashSet<PathBuf>>,
    fail_sync: Mutex<HashSet<PathBuf>>,
    slow_create: Mutex<HashMap<PathBuf, Duration>>,
}

impl FaultyFs {
    pub(crate) fn fail_remove_of(&self, path: &Path) {
        lock(&self.fail_remove).insert(path.to_path_buf());
    }

    pub(crate) fn fail_rename_to(&self, path: &Path) {
        lock(&self.fail_rename).insert(path.to_path_buf());
    }

    pub(crate) fn fail_sync_of(&self, path: &Path) {
        lock(&self.fail_sync).insert(path.to_path_buf());
    }

    pub(crate) fn delay_create_of(&self, path: &Path, delay: Duration) {
        lock(&self.slow_create).insert(path.to_path_buf(), delay);
    }

    pub(crate) fn heal(&self) {
        lock(&self.fail_remove).clear();
        lock(&self.fail_rename).clear();
        lock(&self.fail_sync).clear();
        lock(&self.slow_create).clear();
    }
}

fn lock<T>(value: &Mutex<T>) -> MutexGuard<'_, T> {
    value.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn injected(op: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("injected {} failure for {}", op, path.display()),
    )
}

impl Filesystem for FaultyFs {
    fn exists(&self, path: &Path) -> bool {
        OsFilesystem.exists(path)
    }

    fn create_new(&self, path: &Path) -> io::Result<File> {
        let delay = lock(&self.slow_create).get(path).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        OsFilesystem.create_new(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        OsFilesystem.open_read(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if lock(&self.fail_remove).contains(path) {
            return Err(injected("remove", path));
        }
        OsFilesystem.remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if lock(&self.fail_rename).contains(to) {
            return Err(injected("rename", to));
        }
        OsFilesystem.rename(from, to)
    }

    fn sync_file(&self, path: &Path, file: &mut File) -> io::Result<()> {
        if lock(&self.fail_sync).contains(path) {
            return Err(injected("sync", path));
        }
        OsFilesystem.sync_file(path, file)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        OsFilesystem.sync_dir(dir)
    }
}

/// Config with short waits so contention tests finish quickly.
pub(crate) fn fast_config() -> Config {
    Config {
        wait_timeout_secs: 0.2,
        retry_interval_ms: 10,
        ..Config::default()
    }
}
