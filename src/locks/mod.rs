//! Locking subsystem for ftx.
//!
//! # Lock Files
//!
//! A file `dir/name` is locked by the existence of `dir/.name.lock`. Lock
//! files are created using **create_new** semantics (exclusive create) to
//! ensure that only one process can hold a given lock at a time. The lock is
//! advisory: it only protects against participants that follow the protocol.
//!
//! Creators and updaters take the lock; readers never do, they wait until no
//! lock file exists.
//!
//! # Lock Metadata
//!
//! Each lock file written by ftx contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `mode`: The access mode (create/update)
//!
//! # RAII
//!
//! A [`LockFile`] removes its lock file when dropped. If deletion fails
//! during drop, a warning is logged but the program does not crash.

mod lock_file;
mod metadata;
mod operations;
mod types;
mod wait;


// Re-export public API
pub use lock_file::{LockFile, is_held};
pub use metadata::{LockMetadata, format_age, is_stale_since};
pub use operations::{clear_lock, list_locks};
pub use types::{ClearedLock, LockInfo, StagingOutcome};
pub use wait::{WaitPolicy, acquire_with_timeout, wait_for_release};
