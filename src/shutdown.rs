//! Cooperative cancellation for the control loop.
//!
//! The signal handler calls [`ShutdownToken::cancel`]; the loop checks
//! [`ShutdownToken::is_cancelled`] at the top of every heartbeat and
//! sleeps through [`ShutdownToken::wait_timeout`], which wakes as soon as
//! the token is cancelled.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter.  Idempotent.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`.  Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            // Spurious wakeups loop back with the shrunken remainder.
            cancelled = cvar
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }
}
