//! Cancellation for blocking waits.
//!
//! Every poll loop sleeps through a [`CancelToken`] instead of
//! `thread::sleep`, so an interrupt handler (or an interactive session
//! aborting a statement) can end a stuck wait immediately.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A cloneable, thread-safe cancellation flag with an interruptible sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every wait using this token (or a clone of it).
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        *cancelled = true;
        self.inner.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the token was cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        // Past the end of `Instant`, only cancellation ends the sleep.
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        while !*cancelled {
            cancelled = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.inner
                        .wakeup
                        .wait_timeout(cancelled, deadline - now)
                        .unwrap_or_else(|poison| poison.into_inner())
                        .0
                }
                None => self
                    .inner
                    .wakeup
                    .wait(cancelled)
                    .unwrap_or_else(|poison| poison.into_inner()),
            };
        }
        true
    }
}
