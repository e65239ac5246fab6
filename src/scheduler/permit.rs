//! Process-local write permit
//!
//! A single-permit semaphore serializing commits and checkpoint
//! operations within one coordinator. In fair mode waiters are admitted
//! strictly in arrival order; `try_acquire` always barges.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::cancel::{Cancellation, Interrupted};

/// How often blocked waiters re-check their cancellation signal.
const CANCEL_POLL: Duration = Duration::from_millis(10);

pub struct WritePermit {
    fair: bool,
    state: Mutex<PermitState>,
    released: Condvar,
}

#[derive(Default)]
struct PermitState {
    held: bool,
    next_ticket: u64,
    waiting: VecDeque<u64>,
}

/// Holds the permit until dropped.
#[must_use = "the permit is released when the guard is dropped"]
pub struct PermitGuard<'a> {
    permit: &'a WritePermit,
}

impl WritePermit {
    pub fn new(fair: bool) -> Self {
        Self {
            fair,
            state: Mutex::new(PermitState::default()),
            released: Condvar::new(),
        }
    }

    pub fn is_fair(&self) -> bool {
        self.fair
    }

    /// Blocks until the permit is available.
    pub fn acquire(&self, cancel: &Cancellation) -> Result<PermitGuard<'_>, Interrupted> {
        match self.acquire_until(None, cancel)? {
            Some(guard) => Ok(guard),
            // Without a deadline the wait only ends by acquisition or cancel
            None => Err(Interrupted),
        }
    }

    /// Takes the permit if it is free right now, ignoring queued waiters.
    pub fn try_acquire(&self) -> Option<PermitGuard<'_>> {
        let mut state = self.lock();
        if state.held {
            return None;
        }
        state.held = true;
        Some(PermitGuard { permit: self })
    }

    /// Waits at most `timeout`. `Ok(None)` means the wait timed out.
    pub fn try_acquire_for(
        &self,
        timeout: Duration,
        cancel: &Cancellation,
    ) -> Result<Option<PermitGuard<'_>>, Interrupted> {
        self.acquire_until(Some(Instant::now() + timeout), cancel)
    }

    pub fn is_available(&self) -> bool {
        !self.lock().held
    }

    /// Number of threads blocked in `acquire` or `try_acquire_for`.
    pub fn queue_length(&self) -> usize {
        self.lock().waiting.len()
    }

    fn acquire_until(
        &self,
        deadline: Option<Instant>,
        cancel: &Cancellation,
    ) -> Result<Option<PermitGuard<'_>>, Interrupted> {
        cancel.check()?;

        let mut state = self.lock();
        if !state.held && (!self.fair || state.waiting.is_empty()) {
            state.held = true;
            return Ok(Some(PermitGuard { permit: self }));
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting.push_back(ticket);

        loop {
            if cancel.is_cancelled() {
                self.leave(&mut state, ticket);
                return Err(Interrupted);
            }

            let admitted = !self.fair || state.waiting.front() == Some(&ticket);
            if !state.held && admitted {
                state.waiting.retain(|t| *t != ticket);
                state.held = true;
                return Ok(Some(PermitGuard { permit: self }));
            }

            let mut wait = CANCEL_POLL;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    self.leave(&mut state, ticket);
                    return Ok(None);
                }
                wait = wait.min(deadline - now);
            }

            state = self
                .released
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Gives up a queued ticket. The next waiter may now be at the front.
    fn leave(&self, state: &mut PermitState, ticket: u64) {
        state.waiting.retain(|t| *t != ticket);
        self.released.notify_all();
    }

    fn release(&self) {
        self.lock().held = false;
        self.released.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, PermitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        self.permit.release();
    }
}
