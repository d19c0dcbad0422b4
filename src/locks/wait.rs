//! Bounded, cancellable polling for lock files.
//!
//! There is no portable way to block on another process's file, so waiting
//! is a poll loop: attempt, sleep `retry_interval` (plus jitter), attempt
//! again, until the attempt succeeds, the wall-clock budget is spent, or the
//! cancellation token fires. The sleep before the final attempt is clamped
//! to the remaining budget, so a timeout is reported no earlier than
//! `timeout` and no later than `timeout` plus one attempt.

use super::lock_file::{LockFile, is_held};
use super::metadata::LockMetadata;
use crate::cancel::CancelToken;
use crate::error::{FileError, Result};
use crate::fs::Filesystem;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing of a lock wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Wall-clock budget for the whole wait.
    pub timeout: Duration,
    /// Sleep between attempts.
    pub retry_interval: Duration,
    /// Upper bound of a random extra sleep added to each interval.
    pub jitter: Duration,
}

impl WaitPolicy {
    /// Sleep before the next attempt.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.retry_interval;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_micros() as u64);
        self.retry_interval + Duration::from_micros(extra)
    }
}

/// Acquire the lock file for `target`, waiting while another holder has it.
///
/// # Returns
///
/// * `Ok(LockFile)` - Lock acquired
/// * `Err(FileError::Timeout)` - The lock stayed held for the whole budget
/// * `Err(FileError::Cancelled)` - The token was cancelled while waiting
/// * Any non-transient error from the acquisition attempt
pub fn acquire_with_timeout(
    fs: &Arc<dyn Filesystem>,
    target: &Path,
    metadata: &LockMetadata,
    policy: &WaitPolicy,
    cancel: &CancelToken,
) -> Result<LockFile> {
    poll(target, policy, cancel, || {
        match LockFile::try_acquire(fs.clone(), target, metadata) {
            Ok(lock) => Ok(Some(lock)),
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    })
}

/// Wait until no lock file exists for `target`.
///
/// Does not take the lock; a writer may acquire it again right after this
/// returns.
pub fn wait_for_release(
    fs: &dyn Filesystem,
    target: &Path,
    policy: &WaitPolicy,
    cancel: &CancelToken,
) -> Result<()> {
    poll(target, policy, cancel, || {
        Ok((!is_held(fs, target)).then_some(()))
    })
}

fn poll<T>(
    target: &Path,
    policy: &WaitPolicy,
    cancel: &CancelToken,
    mut attempt: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(target));
        }

        attempts += 1;
        if let Some(value) = attempt()? {
            if attempts > 1 {
                tracing::debug!(path = %target.display(), attempts, "lock wait finished");
            }
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            tracing::debug!(
                path = %target.display(),
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "lock wait timed out"
            );
            return Err(FileError::Timeout {
                path: target.to_path_buf(),
            });
        }

        let delay = policy.next_delay().min(policy.timeout - elapsed);
        tracing::trace!(path = %target.display(), attempts, delay_ms = delay.as_millis() as u64, "lock busy, retrying");
        if cancel.sleep(delay) {
            return Err(cancelled(target));
        }
    }
}

fn cancelled(target: &Path) -> FileError {
    FileError::Cancelled(format!(
        "waiting for file {} was cancelled",
        target.display()
    ))
}
