//! Optimistic and pessimistic merge
//!
//! A commit first retries lock-free with exponential backoff. If the
//! backoff passes the configured maximum, the commit escalates: it
//! publishes a lock token into the head, merges against the locked
//! snapshot and publishes the result with the token removed, which
//! releases the lock in the same CAS.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::clock::now_millis;
use crate::commit::{Commit, CommitHook, CommitInfo};
use crate::observability::{Event, Logger};
use crate::store::layout::ROOT;
use crate::tree::{ConflictAnnotatingRebase, NodeBuilder, NodeState};

use super::cancel::Cancellation;
use super::coordinator::CommitCoordinator;
use super::errors::{MergeError, MergeResult};
use super::lock_token::LockToken;

/// Longest sleep while somebody else holds the persisted lock.
const LOCK_POLL: Duration = Duration::from_secs(1);

enum Optimistic {
    Merged(NodeState),
    /// Give up on lock-free retries and lock for `lease`.
    Escalate { lease: Duration },
}

/// Up to one millisecond of random delay.
fn jitter() -> Duration {
    Duration::from_nanos(rand::thread_rng().gen_range(0..1_000_000))
}

impl CommitCoordinator {
    /// Merges `changes` into the head and returns the new content root.
    ///
    /// `changes` must be built on a content root obtained from this
    /// coordinator. On success it is reset to the returned root; on
    /// failure it is left as it was.
    pub fn schedule(
        &self,
        changes: &mut NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
    ) -> MergeResult<NodeState> {
        self.schedule_commit(Commit::new(changes, hook, info), &Cancellation::never())
    }

    /// [`schedule`](Self::schedule) with a cancellable wait.
    pub fn schedule_commit(&self, commit: Commit<'_>, cancel: &Cancellation) -> MergeResult<NodeState> {
        let no_op = !commit.has_changes();
        let Commit {
            changes,
            hook,
            info,
        } = commit;

        if no_op {
            let root = self.root();
            changes.reset(root.clone());
            return Ok(root);
        }

        let queued_at = if self.permit.is_available() {
            None
        } else {
            self.metrics.record_enqueued();
            let waiting = self.permit.queue_length().to_string();
            Logger::event(Event::CommitQueued, &[("queue_length", waiting.as_str())]);
            Some(Instant::now())
        };
        let acquired = self.permit.acquire(cancel);
        if let Some(queued_at) = queued_at {
            self.metrics.record_dequeued(queued_at.elapsed());
        }

        let result = acquired.map_err(MergeError::from).and_then(|_guard| {
            let start = Instant::now();
            let merged = self.execute(changes, hook, info, cancel)?;
            self.metrics.record_commit(start.elapsed());
            Ok(merged)
        });

        match result {
            Ok(merged) => {
                let head_id = merged.id().short();
                Logger::event(Event::CommitMerged, &[("root", head_id.as_str())]);
                changes.reset(merged.clone());
                Ok(merged)
            }
            Err(err) => {
                Logger::event(
                    Event::CommitRejected,
                    &[("code", err.code().as_str()), ("message", err.message())],
                );
                Err(err)
            }
        }
    }

    fn execute(
        &self,
        changes: &NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
        cancel: &Cancellation,
    ) -> MergeResult<NodeState> {
        match self.optimistic_merge(changes, hook, info, cancel)? {
            Optimistic::Merged(root) => Ok(root),
            Optimistic::Escalate { lease } => {
                self.metrics.increment_escalations();
                let lease_ms = lease.as_millis().to_string();
                Logger::event(Event::CommitEscalated, &[("lease_ms", lease_ms.as_str())]);
                self.pessimistic_merge(changes, hook, info, lease, cancel)
            }
        }
    }

    fn optimistic_merge(
        &self,
        changes: &NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
        cancel: &Cancellation,
    ) -> MergeResult<Optimistic> {
        let mut longest = Duration::from_nanos(1);
        let mut backoff = Duration::from_millis(1);

        while backoff < self.maximum_backoff {
            let start = Instant::now();
            self.refresh_head(true);
            let state = self.cached_head();

            // A live token means another party is inside its pessimistic
            // merge; publishing now would only lose the race.
            if LockToken::live(&state, now_millis()).is_none() {
                let builder = self.prepare(&state, changes, hook, info)?;
                let after = builder.node_state();
                if self.set_head(&state, &after, info)? {
                    return Ok(Optimistic::Merged(after.child_node(ROOT)));
                }
            }

            self.metrics.increment_optimistic_retries();
            if Logger::enabled(Event::CommitRetry.severity()) {
                let backoff_ms = backoff.as_millis().to_string();
                Logger::event(Event::CommitRetry, &[("backoff_ms", backoff_ms.as_str())]);
            }
            cancel.sleep(backoff + jitter())?;

            longest = longest.max(start.elapsed());
            backoff = backoff.saturating_mul(2);
        }

        // Lease granularity is milliseconds
        let lease = Duration::from_millis(u64::try_from(longest.as_millis()).unwrap_or(u64::MAX));
        Ok(Optimistic::Escalate { lease })
    }

    fn pessimistic_merge(
        &self,
        changes: &NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
        lease: Duration,
        cancel: &Cancellation,
    ) -> MergeResult<NodeState> {
        loop {
            self.refresh_head(true);
            let state = self.cached_head();
            let now = now_millis();

            if let Some(held) = LockToken::live(&state, now) {
                self.metrics.increment_lock_waits();
                if Logger::enabled(Event::CommitLockWait.severity()) {
                    let until = held.timeout().to_string();
                    Logger::event(Event::CommitLockWait, &[("timeout", until.as_str())]);
                }
                cancel.sleep(held.remaining(now).min(LOCK_POLL) + jitter())?;
                continue;
            }

            let token = LockToken::issue(now, lease);
            let mut builder = state.builder();
            token.stage(&mut builder);
            let locked = builder.node_state();
            // Taking the lock leaves the content root alone, so nobody is notified
            if !self.swap_head(&state, &locked)? {
                continue;
            }

            let timeout = token.timeout().to_string();
            Logger::event(
                Event::CommitLockAcquired,
                &[("token", token.token()), ("timeout", timeout.as_str())],
            );

            match self.merge_locked(&locked, changes, hook, info) {
                Ok(Some(root)) => return Ok(root),
                // Somebody bypassed the lock; start over
                Ok(None) => continue,
                Err(err) => {
                    self.release_lock(&locked);
                    return Err(err);
                }
            }
        }
    }

    /// Merges against the snapshot carrying our token and publishes the
    /// result without it. `None` if the head moved under the lock.
    fn merge_locked(
        &self,
        locked: &NodeState,
        changes: &NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
    ) -> MergeResult<Option<NodeState>> {
        let mut builder = self.prepare(locked, changes, hook, info)?;
        LockToken::clear(&mut builder);
        let after = builder.node_state();
        if self.set_head(locked, &after, info)? {
            Ok(Some(after.child_node(ROOT)))
        } else {
            Ok(None)
        }
    }

    /// Best effort; an unreleased token expires on its own.
    fn release_lock(&self, locked: &NodeState) {
        let mut builder = locked.builder();
        LockToken::clear(&mut builder);
        let unlocked = builder.node_state();
        if !matches!(self.swap_head(locked, &unlocked), Ok(true)) {
            Logger::warn(
                "COMMIT_LOCK_RELEASE_FAILED",
                &[("reason", "head moved or store refused the write")],
            );
        }
    }

    /// Rebases `changes` onto `state` and runs the hook.
    ///
    /// Returns a builder over `state` whose content root is the hook's
    /// output. If `changes` was built on exactly the current content
    /// root, the hook sees the change set as is.
    fn prepare(
        &self,
        state: &NodeState,
        changes: &NodeBuilder,
        hook: &dyn CommitHook,
        info: &CommitInfo,
    ) -> MergeResult<NodeBuilder> {
        let mut builder = state.builder();
        let base = changes.base_state();
        let current = state.child_node(ROOT);

        let processed = if NodeState::fast_equals(base, &current) {
            hook.process_commit(base, changes.node_state(), info)?
        } else {
            let after = changes.node_state();
            after.compare_against_base(base, &mut ConflictAnnotatingRebase::new(builder.child(ROOT)));
            let rebased = builder.child_state(ROOT);
            hook.process_commit(&current, rebased, info)?
        };

        builder.set_child_node(ROOT, processed);
        Ok(builder)
    }
}
