//! Persistent content tree
//!
//! Immutable, structurally shared key/value trees used as the snapshot
//! format of the store:
//!
//! - `NodeState` - immutable node, cheap to clone, identified by content hash
//! - `NodeBuilder` - copy-on-write staging builder over a base state
//! - `NodeStateDiff` - visitor over the differences of two states
//! - `ConflictAnnotatingRebase` - replays a diff onto a newer base
//!
//! Encoding trees to bytes is left to the storage backend; this module
//! only defines the logical model the commit scheduler works on.

mod builder;
mod diff;
mod node;
mod property;
mod rebase;
mod record_id;

pub use builder::NodeBuilder;
pub use diff::NodeStateDiff;
pub use node::NodeState;
pub use property::PropertyValue;
pub use rebase::{ConflictAnnotatingRebase, ConflictType, CONFLICT};
pub use record_id::RecordId;
