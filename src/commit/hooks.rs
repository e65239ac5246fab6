//! Commit hooks
//!
//! A hook sees the content root before and after a change and returns
//! the root that is actually published, or rejects the change.

use crate::tree::{NodeState, NodeStateDiff, PropertyValue, CONFLICT};

use super::failure::CommitFailed;
use super::info::CommitInfo;

/// Validation and transformation step run before every publish attempt.
///
/// Hooks may run more than once per commit (once per merge attempt)
/// and must not have side effects outside the returned tree.
pub trait CommitHook: Send + Sync {
    fn process_commit(
        &self,
        before: &NodeState,
        after: NodeState,
        info: &CommitInfo,
    ) -> Result<NodeState, CommitFailed>;
}

impl<F> CommitHook for F
where
    F: Fn(&NodeState, NodeState, &CommitInfo) -> Result<NodeState, CommitFailed> + Send + Sync,
{
    fn process_commit(
        &self,
        before: &NodeState,
        after: NodeState,
        info: &CommitInfo,
    ) -> Result<NodeState, CommitFailed> {
        self(before, after, info)
    }
}

/// Publishes `after` unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHook;

impl CommitHook for EmptyHook {
    fn process_commit(
        &self,
        _before: &NodeState,
        after: NodeState,
        _info: &CommitInfo,
    ) -> Result<NodeState, CommitFailed> {
        Ok(after)
    }
}

/// Runs hooks in order, each on the output of the previous one.
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Box<dyn CommitHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl CommitHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl CommitHook for CompositeHook {
    fn process_commit(
        &self,
        before: &NodeState,
        after: NodeState,
        info: &CommitInfo,
    ) -> Result<NodeState, CommitFailed> {
        let mut state = after;
        for hook in &self.hooks {
            state = hook.process_commit(before, state, info)?;
        }
        Ok(state)
    }
}

/// Rejects trees that still carry rebase conflict markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictHook;

/// Error code of an unresolved-conflict rejection.
pub const UNRESOLVED_CONFLICT: u32 = 1;

impl CommitHook for ConflictHook {
    fn process_commit(
        &self,
        before: &NodeState,
        after: NodeState,
        _info: &CommitInfo,
    ) -> Result<NodeState, CommitFailed> {
        let mut validator = ConflictValidator::new(String::from("/"));
        after.compare_against_base(before, &mut validator);
        match validator.failure {
            Some(failure) => Err(failure),
            None => Ok(after),
        }
    }
}

/// Only visits added and changed subtrees.
struct ConflictValidator {
    path: String,
    failure: Option<CommitFailed>,
}

impl ConflictValidator {
    fn new(path: String) -> Self {
        Self {
            path,
            failure: None,
        }
    }

    fn check(&mut self, name: &str, before: &NodeState, after: &NodeState) -> bool {
        if name == CONFLICT {
            self.failure = Some(CommitFailed::conflict(
                UNRESOLVED_CONFLICT,
                format!("Unresolved conflicts in {}", self.path),
            ));
            return false;
        }
        let path = if self.path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.path, name)
        };
        let mut child = ConflictValidator::new(path);
        if !after.compare_against_base(before, &mut child) {
            self.failure = child.failure;
            return false;
        }
        true
    }
}

impl NodeStateDiff for ConflictValidator {
    fn property_added(&mut self, _: &str, _: &PropertyValue) -> bool {
        true
    }

    fn property_changed(&mut self, _: &str, _: &PropertyValue, _: &PropertyValue) -> bool {
        true
    }

    fn property_deleted(&mut self, _: &str, _: &PropertyValue) -> bool {
        true
    }

    fn child_node_added(&mut self, name: &str, after: &NodeState) -> bool {
        self.check(name, &NodeState::missing(), after)
    }

    fn child_node_changed(&mut self, name: &str, before: &NodeState, after: &NodeState) -> bool {
        self.check(name, before, after)
    }

    fn child_node_deleted(&mut self, _: &str, _: &NodeState) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitFailedKind;

    fn info() -> CommitInfo {
        CommitInfo::new("test", None)
    }

    fn tree_with_conflict() -> (NodeState, NodeState) {
        let before = NodeState::empty();
        let mut builder = before.builder();
        builder
            .child("a")
            .child(CONFLICT)
            .child("changeChangedProperty")
            .set_property("x", 1i64);
        (before, builder.node_state())
    }

    #[test]
    fn test_empty_hook_is_identity() {
        let mut builder = NodeState::empty().builder();
        builder.set_property("x", "y");
        let after = builder.node_state();
        let out = EmptyHook
            .process_commit(&NodeState::empty(), after.clone(), &info())
            .unwrap();
        assert!(NodeState::fast_equals(&out, &after));
    }

    #[test]
    fn test_conflict_hook_rejects_markers() {
        let (before, after) = tree_with_conflict();
        let err = ConflictHook.process_commit(&before, after, &info()).unwrap_err();
        assert_eq!(err.kind(), CommitFailedKind::Conflict);
        assert_eq!(err.code(), UNRESOLVED_CONFLICT);
        assert_eq!(err.message(), "Unresolved conflicts in /a");
    }

    #[test]
    fn test_conflict_hook_accepts_clean_trees() {
        let before = NodeState::empty();
        let mut builder = before.builder();
        builder.child("a").child("b").set_property("x", true);
        let after = builder.node_state();
        assert!(ConflictHook.process_commit(&before, after, &info()).is_ok());
    }

    #[test]
    fn test_composite_chains_in_order() {
        let hook = CompositeHook::new()
            .with(|_: &NodeState, after: NodeState, _: &CommitInfo| -> Result<NodeState, CommitFailed> {
                let mut builder = after.builder();
                builder.set_property("step", 1i64);
                Ok(builder.node_state())
            })
            .with(|_: &NodeState, after: NodeState, _: &CommitInfo| -> Result<NodeState, CommitFailed> {
                let step = after.long("step").unwrap_or(0);
                let mut builder = after.builder();
                builder.set_property("step", step + 1);
                Ok(builder.node_state())
            });
        assert_eq!(hook.len(), 2);

        let out = hook
            .process_commit(&NodeState::empty(), NodeState::empty(), &info())
            .unwrap();
        assert_eq!(out.long("step"), Some(2));
    }

    #[test]
    fn test_composite_stops_at_first_rejection() {
        let hook = CompositeHook::new().with(ConflictHook).with(
            |_: &NodeState, _: NodeState, _: &CommitInfo| -> Result<NodeState, CommitFailed> {
                panic!("must not run after a rejection")
            },
        );
        let (before, after) = tree_with_conflict();
        assert!(hook.process_commit(&before, after, &info()).is_err());
    }
}
