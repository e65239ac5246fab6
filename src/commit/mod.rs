//! Commit types
//!
//! A commit is a staged change set plus the hook that validates it and
//! the metadata that travels with it to the change notifier.

mod failure;
mod hooks;
mod info;

pub use failure::{CommitFailed, CommitFailedKind};
pub use hooks::{CommitHook, CompositeHook, ConflictHook, EmptyHook, UNRESOLVED_CONFLICT};
pub use info::CommitInfo;

use crate::tree::{NodeBuilder, NodeState};

/// A unit of proposed mutation.
///
/// `changes` must be a root-level builder derived from a snapshot returned
/// by the coordinator. On success it is reset to the merged root.
pub struct Commit<'a> {
    pub changes: &'a mut NodeBuilder,
    pub hook: &'a dyn CommitHook,
    pub info: &'a CommitInfo,
}

impl<'a> Commit<'a> {
    pub fn new(changes: &'a mut NodeBuilder, hook: &'a dyn CommitHook, info: &'a CommitInfo) -> Self {
        Self {
            changes,
            hook,
            info,
        }
    }

    /// True if applying the change set would not alter its base.
    pub fn has_changes(&self) -> bool {
        let after = self.changes.node_state();
        !NodeState::fast_equals(self.changes.base_state(), &after)
    }
}
