//! Configuration types and defaults for ftx.
//!
//! This module defines enums and default value functions used by the Config
//! struct.

use serde::{Deserialize, Serialize};

/// How a committed staging file replaces the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Rename the staging file over the original in one step.
    ///
    /// Atomic on POSIX filesystems: readers see either the old or the new
    /// content, never neither.
    Rename,
    /// Remove the original first, then rename the staging file into place.
    ///
    /// Needed where rename cannot overwrite an existing file (Windows, some
    /// SMB shares). Leaves a window in which the original is absent.
    RemoveThenRename,
}

impl Default for ReplaceMode {
    #[cfg(unix)]
    fn default() -> Self {
        Self::Rename
    }

    #[cfg(not(unix))]
    fn default() -> Self {
        Self::RemoveThenRename
    }
}

// Default value functions for serde
pub(crate) fn default_wait_timeout_secs() -> f64 {
    30.0
}
pub(crate) fn default_retry_interval_ms() -> u64 {
    50
}
pub(crate) fn default_lock_stale_minutes() -> u32 {
    120
}
