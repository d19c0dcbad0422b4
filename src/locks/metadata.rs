//! What a lock file says about its holder.

use crate::error::{FileError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// JSON body written into lock files.
///
/// Other processes only test whether a lock file exists; the content is there
/// for humans and for `lock list`. Lock files written by other tools may be
/// empty, so readers must treat missing metadata as normal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// `user@host` of the holder.
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// The access mode the lock was taken for (create/update).
    pub mode: String,
}

impl LockMetadata {
    /// Metadata for a lock taken now by this process.
    pub fn new(mode: &str) -> Self {
        Self {
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            mode: mode.to_string(),
        }
    }

    /// Parse the metadata of an existing lock file.
    ///
    /// # Returns
    ///
    /// * `Err(FileError::Stream)` - The file could not be read
    /// * `Err(FileError::Io)` - The file is empty or not ours
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FileError::stream(format!("failed to read lock file '{}'", path.display()), e)
        })?;

        serde_json::from_str(&content).map_err(|e| {
            FileError::Io(format!(
                "lock file '{}' carries no metadata: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FileError::Io(format!("failed to serialize lock metadata: {}", e)))
    }
}

/// Whether a lock taken at `created_at` is older than `stale_minutes`.
pub fn is_stale_since(created_at: DateTime<Utc>, stale_minutes: u32) -> bool {
    Utc::now().signed_duration_since(created_at).num_minutes() > i64::from(stale_minutes)
}

/// Format a lock age as `Xd Yh`, `Xh Ym` or `Xm`.
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    match hostname::get() {
        Ok(host) => format!("{}@{}", user, host.to_string_lossy()),
        Err(_) => user,
    }
}
