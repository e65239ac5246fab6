//! Structural comparison of two node states
//!
//! `compare_against_base` walks two trees side by side and reports every
//! difference to a [`NodeStateDiff`] visitor. Subtrees with equal record
//! ids are skipped without being visited, so the cost of a comparison is
//! proportional to the size of the change, not the size of the tree.

use super::node::NodeState;
use super::property::PropertyValue;

/// Receives the differences found by [`NodeState::compare_against_base`].
///
/// Every callback returns `true` to continue or `false` to abort the
/// comparison. Child callbacks are not recursive by themselves: an
/// implementation that wants to descend into a changed child calls
/// `compare_against_base` on it.
pub trait NodeStateDiff {
    fn property_added(&mut self, name: &str, after: &PropertyValue) -> bool;

    fn property_changed(&mut self, name: &str, before: &PropertyValue, after: &PropertyValue)
        -> bool;

    fn property_deleted(&mut self, name: &str, before: &PropertyValue) -> bool;

    fn child_node_added(&mut self, name: &str, after: &NodeState) -> bool;

    fn child_node_changed(&mut self, name: &str, before: &NodeState, after: &NodeState) -> bool;

    fn child_node_deleted(&mut self, name: &str, before: &NodeState) -> bool;
}

impl NodeState {
    /// Reports the changes that turn `base` into `self`.
    ///
    /// Returns `false` if the visitor aborted the comparison.
    pub fn compare_against_base<D>(&self, base: &NodeState, diff: &mut D) -> bool
    where
        D: NodeStateDiff + ?Sized,
    {
        if NodeState::fast_equals(self, base) {
            return true;
        }

        let after_props = self.property_map();
        let before_props = base.property_map();

        for (name, after) in after_props {
            let proceed = match before_props.get(name) {
                None => diff.property_added(name, after),
                Some(before) if before != after => diff.property_changed(name, before, after),
                Some(_) => true,
            };
            if !proceed {
                return false;
            }
        }
        for (name, before) in before_props {
            if !after_props.contains_key(name) && !diff.property_deleted(name, before) {
                return false;
            }
        }

        let after_children = self.child_map();
        let before_children = base.child_map();

        for (name, after) in after_children {
            let proceed = match before_children.get(name) {
                None => diff.child_node_added(name, after),
                Some(before) if !NodeState::fast_equals(before, after) => {
                    diff.child_node_changed(name, before, after)
                }
                Some(_) => true,
            };
            if !proceed {
                return false;
            }
        }
        for (name, before) in before_children {
            if !after_children.contains_key(name) && !diff.child_node_deleted(name, before) {
                return false;
            }
        }

        true
    }
}
