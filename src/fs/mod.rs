//! Filesystem utilities for ftx.
//!
//! This module provides the naming convention for sentinel and staging files,
//! the [`Filesystem`] seam every correctness-relevant call goes through, and
//! staging files that are moved over their original on commit.

mod ops;
pub mod paths;
mod staging;

pub use ops::{Filesystem, OsFilesystem};
pub(crate) use ops::remove_if_exists;
pub use paths::{LOCK_FILE_SUFFIX, TEMP_FILE_SUFFIX, lock_file_path, temp_file_path};
pub use staging::StagingFile;
