use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Set-once cancellation signal shared between a session loop and the
/// connection layer that tears it down.
///
/// `cancel` is idempotent; setting it twice is a no-op. The signal is the
/// only cross-thread mutation point into a running session. `wait` doubles
/// as the cadence timer: it sleeps up to the given interval but wakes
/// immediately when the token is cancelled, so cancellation latency is
/// bounded by one detect call rather than a full interval.
#[derive(Default)]
pub struct CancelToken {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        let mut cancelled = self.lock();
        if !*cancelled {
            *cancelled = true;
            self.condvar.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Block for up to `timeout`, returning early when cancelled.
    ///
    /// Returns true when the token is (or becomes) cancelled, false when the
    /// full timeout elapsed. A zero timeout is a plain cancellation check.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.lock();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
        true
    }

    // A poisoned flag is still a valid bool; recover instead of unwrapping.
    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
