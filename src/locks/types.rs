//! Lock information structures.

use super::metadata::{LockMetadata, format_age};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Information about a lock file found on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The file the lock guards.
    pub target: PathBuf,

    /// The lock metadata, if the lock file contains any.
    pub metadata: Option<LockMetadata>,

    /// When the lock was taken (metadata timestamp, else file mtime).
    pub created_at: Option<DateTime<Utc>>,

    /// Whether a staging file exists next to the target.
    pub has_staging_file: bool,

    /// Whether the lock is stale.
    pub is_stale: bool,
}

impl LockInfo {
    /// Human-readable age, or `?` when unknown.
    pub fn age_string(&self) -> String {
        match self.created_at {
            Some(created_at) => format_age(Utc::now().signed_duration_since(created_at)),
            None => "?".to_string(),
        }
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (owner, mode) = match &self.metadata {
            Some(meta) => (meta.owner.as_str(), meta.mode.as_str()),
            None => ("unknown", "unknown"),
        };
        write!(
            f,
            "{} (owner: {}, age: {}, mode: {}{})",
            self.target.display(),
            owner,
            self.age_string(),
            mode,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}

/// What `clear_lock` did with a leftover staging file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingOutcome {
    /// No staging file was present.
    None,
    /// The target still existed; the staging file was deleted.
    Discarded,
    /// The target was missing; the staging file was moved into its place.
    Restored,
}

/// Result of forcibly clearing a lock.
#[derive(Debug, Clone)]
pub struct ClearedLock {
    pub info: LockInfo,
    pub staging: StagingOutcome,
}
