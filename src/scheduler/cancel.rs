//! Explicit cancellation of blocking waits

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// A blocking wait or sleep was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wait interrupted by cancellation")
    }
}

impl std::error::Error for Interrupted {}

/// Cloneable cancellation signal shared between a caller and the
/// operation it started.
///
/// Cancellation is sticky: once cancelled, every later wait on the same
/// signal fails immediately.
#[derive(Clone, Default)]
pub struct Cancellation {
    inner: Option<Arc<Signal>>,
}

#[derive(Default)]
struct Signal {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Signal {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(Signal::default())),
        }
    }

    /// A signal that can never fire.
    pub fn never() -> Self {
        Self { inner: None }
    }

    pub fn cancel(&self) {
        if let Some(signal) = &self.inner {
            *signal.lock() = true;
            signal.wake.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            Some(signal) => *signal.lock(),
            None => false,
        }
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, returning early with `Interrupted` on cancel.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let signal = match &self.inner {
            Some(signal) => signal,
            None => {
                thread::sleep(duration);
                return Ok(());
            }
        };

        let deadline = Instant::now() + duration;
        let mut cancelled = signal.lock();
        loop {
            if *cancelled {
                return Err(Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            cancelled = signal
                .wake
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancellable", &self.inner.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
