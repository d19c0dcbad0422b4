//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for file access.
///
/// One `Config` is read at startup and handed to a `FileAccess`; it is not
/// mutated afterwards. Unknown fields in the YAML are ignored for forward
/// compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Wait settings
    // =========================================================================
    /// Seconds to wait for a contended lock before giving up.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: f64,

    /// Milliseconds to sleep between lock polls.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Upper bound of random extra milliseconds added to each poll sleep.
    ///
    /// Spreads out processes that started waiting at the same moment.
    #[serde(default)]
    pub retry_jitter_ms: u64,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a lock file is reported as stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Commit settings
    // =========================================================================
    /// How a staged update replaces the original on commit.
    #[serde(default)]
    pub replace_mode: ReplaceMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_jitter_ms: 0,
            lock_stale_minutes: default_lock_stale_minutes(),
            replace_mode: ReplaceMode::default(),
        }
    }
}
