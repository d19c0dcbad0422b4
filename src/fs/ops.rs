//! The filesystem calls the access layer is built from.
//!
//! Handles, lock files and staging files never touch `std::fs` directly for
//! the operations that decide correctness (exclusive create, remove, rename).
//! They go through [`Filesystem`] so failures can be injected between steps.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Primitive filesystem operations.
pub trait Filesystem: fmt::Debug + Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` exclusively for reading and writing; fails if it exists.
    fn create_new(&self, path: &Path) -> io::Result<File>;

    /// Open an existing file read-only.
    fn open_read(&self, path: &Path) -> io::Result<File>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Rename `from` to `to`, replacing `to` where the platform allows it.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Flush `file` (opened at `path`) and its data to disk.
    fn sync_file(&self, path: &Path, file: &mut File) -> io::Result<()>;

    /// Flush a directory entry table to disk.
    fn sync_dir(&self, dir: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn create_new(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn sync_file(&self, _path: &Path, file: &mut File) -> io::Result<()> {
        file.flush()?;
        file.sync_all()
    }

    #[cfg(unix)]
    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Remove `path`, treating "already gone" as success.
pub(crate) fn remove_if_exists(fs: &dyn Filesystem, path: &Path) -> io::Result<()> {
    match fs.remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn create_new_refuses_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.csv");

        OsFilesystem.create_new(&path).unwrap();
        let err = OsFilesystem.create_new(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn created_file_is_readable_and_writable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.csv");

        let mut file = OsFilesystem.create_new(&path).unwrap();
        file.write_all(b"id,name\n").unwrap();
        drop(file);

        let mut content = String::new();
        OsFilesystem
            .open_read(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "id,name\n");
    }

    #[test]
    fn remove_if_exists_tolerates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing");

        assert!(!OsFilesystem.exists(&path));
        remove_if_exists(&OsFilesystem, &path).unwrap();
    }

    #[test]
    fn sync_dir_accepts_current_directory() {
        OsFilesystem.sync_dir(Path::new("")).unwrap();
    }
}
