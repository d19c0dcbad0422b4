//! Exit code constants for the ftx CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: I/O failure (missing/existing file, stream error)
//! - 3: Lock failure (held by another process or already opened here)
//! - 4: Lock wait timed out
//! - 5: Data loss during commit
//! - 130: Interrupted

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// I/O failure: existence precondition violated or stream error.
pub const IO_FAILURE: i32 = 2;

/// Lock failure: the lock file is held, or the path is already open in-process.
pub const LOCK_FAILURE: i32 = 3;

/// The bounded wait for a lock expired.
pub const TIMEOUT: i32 = 4;

/// Commit removed the original but could not move the new content into place.
pub const DATA_LOSS: i32 = 5;

/// Terminated by an interrupt (128 + SIGINT).
pub const INTERRUPTED: i32 = 130;
