//! In-process, content-addressed snapshot store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::tree::NodeState;

use super::errors::{StoreError, StoreResult};
use super::layout::{CHECKPOINTS, ROOT};
use super::{SnapshotId, SnapshotStore};

/// Snapshot store keeping every record in memory.
///
/// Records are keyed by content hash, so writing a state that already
/// exists is free and never counts against the capacity limit. The head
/// pointer only ever moves to ids that were written first.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    capacity_limit: Option<usize>,
    cas_attempts: AtomicU64,
    cas_failures: AtomicU64,
}

#[derive(Debug)]
struct MemoryInner {
    records: HashMap<SnapshotId, NodeState>,
    head: SnapshotId,
}

impl MemoryStore {
    /// Creates a store whose head has empty `root` and `checkpoints` children.
    pub fn new() -> Self {
        let mut builder = NodeState::empty().builder();
        builder.child(ROOT);
        builder.child(CHECKPOINTS);
        Self::with_head(builder.node_state())
    }

    /// Creates a store whose head is `head`.
    pub fn with_head(head: NodeState) -> Self {
        let id = head.id();
        let mut records = HashMap::new();
        records.insert(id, head);
        Self {
            inner: Mutex::new(MemoryInner { records, head: id }),
            capacity_limit: None,
            cas_attempts: AtomicU64::new(0),
            cas_failures: AtomicU64::new(0),
        }
    }

    /// Caps the number of distinct records the store accepts.
    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    /// Number of distinct records held.
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Total compare-and-swap calls.
    pub fn cas_attempts(&self) -> u64 {
        self.cas_attempts.load(Ordering::Relaxed)
    }

    /// Compare-and-swap calls that lost.
    pub fn cas_failures(&self) -> u64 {
        self.cas_failures.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemoryStore {
    fn head_id(&self) -> SnapshotId {
        self.lock().head
    }

    fn read(&self, id: &SnapshotId) -> Option<NodeState> {
        self.lock().records.get(id).cloned()
    }

    fn read_head(&self) -> NodeState {
        let inner = self.lock();
        match inner.records.get(&inner.head) {
            Some(state) => state.clone(),
            // The head is only ever set to written ids.
            None => unreachable!("head {} references no record", inner.head),
        }
    }

    fn write(&self, state: &NodeState) -> StoreResult<SnapshotId> {
        let id = state.id();
        let mut inner = self.lock();
        if inner.records.contains_key(&id) {
            return Ok(id);
        }
        if let Some(limit) = self.capacity_limit {
            if inner.records.len() >= limit {
                return Err(StoreError::CapacityExceeded { limit });
            }
        }
        inner.records.insert(id, state.clone());
        Ok(id)
    }

    fn compare_and_swap(&self, expected: &SnapshotId, next: &SnapshotId) -> bool {
        self.cas_attempts.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        if inner.head == *expected && inner.records.contains_key(next) {
            inner.head = *next;
            true
        } else {
            self.cas_failures.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}
