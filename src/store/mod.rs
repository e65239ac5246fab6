//! Snapshot store interface
//!
//! The commit scheduler consumes exactly two primitives from storage:
//!
//! - reading the snapshot the persisted head currently references
//! - an atomic compare-and-swap of the head pointer
//!
//! plus `write`, which makes a new snapshot addressable before it is
//! published. The head may be moved by parties other than this process
//! (replication, other coordinators sharing the store); every caller of
//! `compare_and_swap` must be prepared to lose.

mod errors;
pub mod layout;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

use crate::tree::{NodeState, RecordId};

/// Identifier of a persisted snapshot.
pub type SnapshotId = RecordId;

/// Storage backend holding immutable snapshots and the head pointer.
pub trait SnapshotStore: Send + Sync {
    /// Id currently referenced by the head pointer.
    fn head_id(&self) -> SnapshotId;

    /// Looks up a previously written snapshot.
    fn read(&self, id: &SnapshotId) -> Option<NodeState>;

    /// Snapshot currently referenced by the head pointer.
    fn read_head(&self) -> NodeState;

    /// Makes `state` addressable, returning its id.
    fn write(&self, state: &NodeState) -> StoreResult<SnapshotId>;

    /// Atomically moves the head from `expected` to `next`.
    ///
    /// Returns `false` without side effects if the head is not `expected`.
    fn compare_and_swap(&self, expected: &SnapshotId, next: &SnapshotId) -> bool;
}
