//! Commit and checkpoint statistics
//!
//! Counters are monotonic; `queue_length` is the only gauge. All values
//! use relaxed atomics, readers get eventually consistent figures.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Registry of coordinator statistics
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Successful publishes caused by this process
    commits: AtomicU64,
    /// Commits that had to wait for the write permit
    queued_total: AtomicU64,
    /// Commits currently waiting for the write permit
    queue_length: AtomicU64,
    /// Highest observed `queue_length`
    queue_peak: AtomicU64,
    /// Total time spent waiting for the permit
    dequeue_time_ns: AtomicU64,
    /// Total time from permit acquisition to publish
    commit_time_ns: AtomicU64,
    /// Optimistic rounds that lost a race or met a live lock
    optimistic_retries: AtomicU64,
    /// Commits that fell back to the persisted lock
    escalations: AtomicU64,
    /// Rounds spent waiting on somebody else's persisted lock
    lock_waits: AtomicU64,
    /// Head changes observed from other publishers
    external_heads: AtomicU64,
    checkpoints_created: AtomicU64,
    checkpoints_failed: AtomicU64,
    checkpoints_removed: AtomicU64,
    checkpoints_expired: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Commit metrics

    pub fn record_commit(&self, elapsed: Duration) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.commit_time_ns
            .fetch_add(duration_ns(elapsed), Ordering::Relaxed);
    }

    /// A commit started waiting for the permit
    pub fn record_enqueued(&self) {
        self.queued_total.fetch_add(1, Ordering::Relaxed);
        let length = self.queue_length.fetch_add(1, Ordering::Relaxed) + 1;
        self.queue_peak.fetch_max(length, Ordering::Relaxed);
    }

    /// A waiting commit left the queue after `waited`
    pub fn record_dequeued(&self, waited: Duration) {
        // Saturate instead of wrapping if calls are ever unbalanced
        let _ = self
            .queue_length
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        self.dequeue_time_ns
            .fetch_add(duration_ns(waited), Ordering::Relaxed);
    }

    pub fn increment_optimistic_retries(&self) {
        self.optimistic_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_escalations(&self) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lock_waits(&self) {
        self.lock_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_external_heads(&self) {
        self.external_heads.fetch_add(1, Ordering::Relaxed);
    }

    // Checkpoint metrics

    pub fn increment_checkpoints_created(&self) {
        self.checkpoints_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checkpoints_failed(&self) {
        self.checkpoints_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checkpoints_removed(&self) {
        self.checkpoints_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_checkpoints_expired(&self, count: u64) {
        self.checkpoints_expired.fetch_add(count, Ordering::Relaxed);
    }

    /// Commits currently waiting for the permit
    pub fn queue_length(&self) -> u64 {
        self.queue_length.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            queued_total: self.queued_total.load(Ordering::Relaxed),
            queue_length: self.queue_length.load(Ordering::Relaxed),
            queue_peak: self.queue_peak.load(Ordering::Relaxed),
            dequeue_time_ns: self.dequeue_time_ns.load(Ordering::Relaxed),
            commit_time_ns: self.commit_time_ns.load(Ordering::Relaxed),
            optimistic_retries: self.optimistic_retries.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            lock_waits: self.lock_waits.load(Ordering::Relaxed),
            external_heads: self.external_heads.load(Ordering::Relaxed),
            checkpoints_created: self.checkpoints_created.load(Ordering::Relaxed),
            checkpoints_failed: self.checkpoints_failed.load(Ordering::Relaxed),
            checkpoints_removed: self.checkpoints_removed.load(Ordering::Relaxed),
            checkpoints_expired: self.checkpoints_expired.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        // A struct of integers always serializes
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// A point-in-time copy of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commits: u64,
    pub queued_total: u64,
    pub queue_length: u64,
    pub queue_peak: u64,
    pub dequeue_time_ns: u64,
    pub commit_time_ns: u64,
    pub optimistic_retries: u64,
    pub escalations: u64,
    pub lock_waits: u64,
    pub external_heads: u64,
    pub checkpoints_created: u64,
    pub checkpoints_failed: u64,
    pub checkpoints_removed: u64,
    pub checkpoints_expired: u64,
}
