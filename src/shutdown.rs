//! Forced teardown on interrupt.
//!
//! On Ctrl-C every pending lock wait is cancelled and every handle still
//! open is aborted before the process exits, so no lock or staging file is
//! left behind by a clean interrupt. Opens caught mid-acquisition undo their
//! work on their own thread, and the handler waits for them (bounded) before
//! letting the process exit. Failures are logged, never raised: the process
//! is on its way out and there is no caller to hand them to.

use crate::context::FileAccess;
use crate::error::{FileError, Result};
use crate::exit_codes;
use std::sync::Arc;
use std::time::Duration;

/// How long an interrupt waits for opens still acquiring to back out.
pub const PENDING_OPEN_GRACE: Duration = Duration::from_secs(5);

/// Abort every handle open through `access`, logging each failure.
///
/// # Returns
///
/// The number of failures logged.
pub fn release_all(access: &FileAccess) -> usize {
    match access.force_release_all_with_errors() {
        Ok(()) => 0,
        Err(err) => {
            let errors = err.into_errors();
            for e in &errors {
                tracing::error!(error = %e, "failed to release file during shutdown");
            }
            errors.len()
        }
    }
}

/// Cancel pending waits, release everything, and return the exit code to use.
pub fn interrupt(access: &FileAccess) -> i32 {
    access.cancel_token().cancel();
    let mut failures = release_all(access);

    if !access.wait_for_pending_opens(PENDING_OPEN_GRACE) {
        tracing::warn!("an open was still acquiring its lock at exit");
    }
    // Opens that completed after the first pass.
    failures += release_all(access);

    if failures > 0 {
        tracing::warn!(failures, "interrupted with files left behind");
    }
    exit_codes::INTERRUPTED
}

/// Install the Ctrl-C handler for `access`. The handler exits the process.
pub fn install_interrupt_handler(access: Arc<FileAccess>) -> Result<()> {
    ctrlc::set_handler(move || {
        let code = interrupt(&access);
        std::process::exit(code);
    })
    .map_err(|e| FileError::Config(format!("failed to install interrupt handler: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;
    use crate::test_support::{FaultyFs, fast_config};
    use std::io::Write;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn interrupt_releases_everything_and_cancels() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "old").unwrap();

        let access = FileAccess::new(fast_config()).unwrap();
        let handle = access.open_for_update(&path).unwrap();
        handle.file_for_write().unwrap().write_all(b"new").unwrap();

        assert_eq!(interrupt(&access), exit_codes::INTERRUPTED);
        assert!(access.cancel_token().is_cancelled());
        assert!(handle.is_closed());
        assert_eq!(access.open_count(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert!(!temp.path().join(".a.txt.lock").exists());
        assert!(!temp.path().join(".a.txt.temp").exists());
    }

    #[test]
    fn release_all_counts_failures() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("new.txt");

        let fs = Arc::new(FaultyFs::default());
        let access = FileAccess::with_filesystem(fast_config(), fs.clone()).unwrap();
        let _handle = access.open_for_create(&path).unwrap();
        fs.fail_remove_of(&path);

        assert_eq!(release_all(&access), 1);
        assert_eq!(release_all(&access), 0);
        assert!(!temp.path().join(".new.txt.lock").exists());
    }

    #[test]
    fn interrupt_waits_for_open_still_acquiring() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        let lock_path = temp.path().join(".a.txt.lock");
        std::fs::write(&path, "old").unwrap();

        // Creating the lock file stalls, as a slow fsync would.
        let faults = Arc::new(FaultyFs::default());
        faults.delay_create_of(&lock_path, Duration::from_millis(300));
        let access = Arc::new(FileAccess::with_filesystem(fast_config(), faults).unwrap());

        let opener = {
            let access = access.clone();
            let path = path.clone();
            thread::spawn(move || access.open_for_update(&path).map(|_| ()))
        };
        thread::sleep(Duration::from_millis(50));

        assert_eq!(interrupt(&access), exit_codes::INTERRUPTED);

        // By the time the handler would exit, the opener has backed out.
        assert!(!lock_path.exists());
        assert!(!temp.path().join(".a.txt.temp").exists());
        assert_eq!(access.open_count(), 0);

        let result = opener.join().unwrap();
        assert!(matches!(result, Err(FileError::Cancelled(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }
}
