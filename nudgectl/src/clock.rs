//! Timekeeping and cooperative cancellation for the cycle loop.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Source of time for the cycle loop.
///
/// Production code uses [`SystemClock`]; tests drive a virtual clock so
/// cadence can be checked without real sleeps.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);

    /// Block for `duration` or until `stop` fires.
    ///
    /// Returns `true` when interrupted by the stop signal.
    fn sleep_until_stopped(&self, duration: Duration, stop: &StopSignal) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn sleep_until_stopped(&self, duration: Duration, stop: &StopSignal) -> bool {
        stop.wait_timeout(duration)
    }
}

/// Shared stop flag, set from the Ctrl+C handler and observed by the loop.
///
/// Waiters are woken as soon as [`StopSignal::stop`] is called.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout` for a stop request. Returns `true` if stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
