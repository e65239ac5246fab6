//! Conflict-annotating rebase
//!
//! Replays the diff of a staged change set onto a builder seeded from a
//! newer base. Changes that apply cleanly are written through. Changes
//! that clash with what the newer base already contains are recorded
//! under a `:conflict` child of the affected node, grouped by conflict
//! kind, holding "our" side of the clash. Validation hooks decide what
//! to do with the markers (see `commit::ConflictHook`).

use std::fmt;

use super::builder::NodeBuilder;
use super::diff::NodeStateDiff;
use super::node::NodeState;
use super::property::PropertyValue;

/// Name of the child collecting conflict markers.
pub const CONFLICT: &str = ":conflict";

/// Kinds of rebase conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    /// Both sides added the same property with different values.
    AddExistingProperty,
    /// We changed a property the other side deleted.
    ChangeDeletedProperty,
    /// Both sides changed a property to different values.
    ChangeChangedProperty,
    /// Both sides deleted the same property.
    DeleteDeletedProperty,
    /// We deleted a property the other side changed.
    DeleteChangedProperty,
    /// Both sides added the same child with different content.
    AddExistingNode,
    /// We changed a child the other side deleted.
    ChangeDeletedNode,
    /// We deleted a child the other side changed.
    DeleteChangedNode,
    /// Both sides deleted the same child.
    DeleteDeletedNode,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::AddExistingProperty => "addExistingProperty",
            ConflictType::ChangeDeletedProperty => "changeDeletedProperty",
            ConflictType::ChangeChangedProperty => "changeChangedProperty",
            ConflictType::DeleteDeletedProperty => "deleteDeletedProperty",
            ConflictType::DeleteChangedProperty => "deleteChangedProperty",
            ConflictType::AddExistingNode => "addExistingNode",
            ConflictType::ChangeDeletedNode => "changeDeletedNode",
            ConflictType::DeleteChangedNode => "deleteChangedNode",
            ConflictType::DeleteDeletedNode => "deleteDeletedNode",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diff visitor applying changes onto `builder`, annotating conflicts.
pub struct ConflictAnnotatingRebase<'a> {
    builder: &'a mut NodeBuilder,
}

impl<'a> ConflictAnnotatingRebase<'a> {
    pub fn new(builder: &'a mut NodeBuilder) -> Self {
        Self { builder }
    }

    fn marker(&mut self, conflict: ConflictType) -> &mut NodeBuilder {
        self.builder.child(CONFLICT).child(conflict.as_str())
    }

    fn property_conflict(&mut self, conflict: ConflictType, name: &str, ours: &PropertyValue) {
        self.marker(conflict).set_property(name, ours.clone());
    }

    fn node_conflict(&mut self, conflict: ConflictType, name: &str, ours: &NodeState) {
        self.marker(conflict).set_child_node(name, ours.clone());
    }
}

impl NodeStateDiff for ConflictAnnotatingRebase<'_> {
    fn property_added(&mut self, name: &str, after: &PropertyValue) -> bool {
        match self.builder.property(name) {
            None => {
                self.builder.set_property(name, after.clone());
            }
            Some(other) if other == after => {}
            Some(_) => self.property_conflict(ConflictType::AddExistingProperty, name, after),
        }
        true
    }

    fn property_changed(&mut self, name: &str, before: &PropertyValue, after: &PropertyValue) -> bool {
        match self.builder.property(name) {
            None => self.property_conflict(ConflictType::ChangeDeletedProperty, name, after),
            Some(other) if other == before => {
                self.builder.set_property(name, after.clone());
            }
            Some(other) if other == after => {}
            Some(_) => self.property_conflict(ConflictType::ChangeChangedProperty, name, after),
        }
        true
    }

    fn property_deleted(&mut self, name: &str, before: &PropertyValue) -> bool {
        match self.builder.property(name) {
            None => self.property_conflict(ConflictType::DeleteDeletedProperty, name, before),
            Some(other) if other == before => {
                self.builder.remove_property(name);
            }
            Some(_) => self.property_conflict(ConflictType::DeleteChangedProperty, name, before),
        }
        true
    }

    fn child_node_added(&mut self, name: &str, after: &NodeState) -> bool {
        if !self.builder.has_child_node(name) {
            self.builder.set_child_node(name, after.clone());
        } else if self.builder.child_state(name) != *after {
            self.node_conflict(ConflictType::AddExistingNode, name, after);
        }
        true
    }

    fn child_node_changed(&mut self, name: &str, before: &NodeState, after: &NodeState) -> bool {
        match self.builder.child_mut(name) {
            Some(child) => {
                after.compare_against_base(before, &mut ConflictAnnotatingRebase::new(child));
            }
            None => self.node_conflict(ConflictType::ChangeDeletedNode, name, after),
        }
        true
    }

    fn child_node_deleted(&mut self, name: &str, before: &NodeState) -> bool {
        if !self.builder.has_child_node(name) {
            self.node_conflict(ConflictType::DeleteDeletedNode, name, before);
        } else if self.builder.child_state(name) == *before {
            self.builder.remove_child(name);
        } else {
            self.node_conflict(ConflictType::DeleteChangedNode, name, before);
        }
        true
    }
}
