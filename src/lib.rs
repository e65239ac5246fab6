//! canopy - commit scheduling for an immutable content tree
//!
//! A head pointer in a [`store::SnapshotStore`] references the current
//! snapshot of the tree. Writers stage changes in a [`tree::NodeBuilder`]
//! and hand them to a [`scheduler::CommitCoordinator`], which rebases them
//! onto the latest head, runs the commit hook and publishes the result with
//! a compare-and-swap. The coordinator also manages checkpoints, frozen
//! copies of the content root stored next to it in the head.
//!
//! ```text
//! head
//! ├── root          content tree
//! └── checkpoints
//!     └── <name>    timestamp, created, properties/, root/
//! ```

pub mod checkpoint;
pub mod commit;
pub mod config;
pub mod notify;
pub mod observability;
pub mod scheduler;
pub mod store;
pub mod tree;

mod clock;

pub use checkpoint::{CheckpointError, CheckpointInfo};
pub use commit::{Commit, CommitFailed, CommitHook, CommitInfo};
pub use config::CoordinatorConfig;
pub use notify::{ChangeDispatcher, ChangeNotifier, Observer};
pub use scheduler::{Cancellation, CommitCoordinator, MergeError};
pub use store::{MemoryStore, SnapshotStore};
pub use tree::{NodeBuilder, NodeState};
