//! NodeBuilder - copy-on-write staging area over a base NodeState
//!
//! A builder starts as a shallow view of its base node. Children are only
//! turned into nested builders when they are accessed for writing, so a
//! change deep in the tree touches just the nodes on its path; everything
//! else stays shared with the base.

use std::collections::BTreeMap;

use super::node::NodeState;
use super::property::PropertyValue;

/// Mutable builder producing new immutable [`NodeState`]s.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    base: NodeState,
    exists: bool,
    properties: BTreeMap<String, PropertyValue>,
    children: BTreeMap<String, Child>,
}

#[derive(Debug, Clone)]
enum Child {
    State(NodeState),
    Builder(NodeBuilder),
}

impl Child {
    fn exists(&self) -> bool {
        match self {
            Child::State(state) => state.exists(),
            Child::Builder(builder) => builder.exists,
        }
    }

    fn state(&self) -> NodeState {
        match self {
            Child::State(state) => state.clone(),
            Child::Builder(builder) => builder.node_state(),
        }
    }

    fn builder(&mut self) -> &mut NodeBuilder {
        if let Child::State(state) = self {
            *self = Child::Builder(NodeBuilder::new(state.clone()));
        }
        match self {
            Child::Builder(builder) => builder,
            Child::State(_) => unreachable!("child converted to a builder above"),
        }
    }
}

impl NodeBuilder {
    /// Creates a builder whose base and current state is `base`.
    pub fn new(base: NodeState) -> Self {
        let mut builder = Self {
            base: NodeState::missing(),
            exists: false,
            properties: BTreeMap::new(),
            children: BTreeMap::new(),
        };
        builder.reset(base);
        builder
    }

    /// Discards all staged changes and rebases the builder on `state`.
    pub fn reset(&mut self, state: NodeState) {
        self.exists = state.exists();
        self.properties = state.property_map().clone();
        self.children = state
            .child_map()
            .iter()
            .map(|(name, child)| (name.clone(), Child::State(child.clone())))
            .collect();
        self.base = state;
    }

    /// The state this builder was created from (or last reset to).
    pub fn base_state(&self) -> &NodeState {
        &self.base
    }

    /// Snapshot of the current staged state.
    ///
    /// Returns the base itself when nothing changed, so unchanged
    /// subtrees keep their identity.
    pub fn node_state(&self) -> NodeState {
        if !self.exists {
            return NodeState::missing();
        }
        let children = self
            .children
            .iter()
            .map(|(name, child)| (name.clone(), child.state()))
            .collect();
        let state = NodeState::from_parts(self.properties.clone(), children);
        if NodeState::fast_equals(&state, &self.base) {
            self.base.clone()
        } else {
            state
        }
    }

    /// Whether the staged state differs from the base.
    pub fn is_modified(&self) -> bool {
        !NodeState::fast_equals(&self.base, &self.node_state())
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    // Properties

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Removes a property, returning whether it was present.
    pub fn remove_property(&mut self, name: &str) -> bool {
        self.properties.remove(name).is_some()
    }

    // Children

    pub fn has_child_node(&self, name: &str) -> bool {
        self.children.get(name).map_or(false, Child::exists)
    }

    pub fn child_node_names(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|(_, child)| child.exists())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Current staged state of a child, [`NodeState::missing`] if absent.
    pub fn child_state(&self, name: &str) -> NodeState {
        self.children
            .get(name)
            .map(Child::state)
            .unwrap_or_else(NodeState::missing)
    }

    /// Builder for the named child, creating an empty child if needed.
    pub fn child(&mut self, name: &str) -> &mut NodeBuilder {
        let builder = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| Child::State(NodeState::missing()))
            .builder();
        if !builder.exists {
            builder.exists = true;
            builder.properties.clear();
            builder.children.clear();
        }
        builder
    }

    /// Builder for an existing child, `None` if there is no such child.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut NodeBuilder> {
        if !self.has_child_node(name) {
            return None;
        }
        self.children.get_mut(name).map(Child::builder)
    }

    /// Replaces the named child with `state`.
    pub fn set_child_node(&mut self, name: &str, state: NodeState) {
        self.children.insert(name.to_string(), Child::State(state));
    }

    /// Removes a child, returning whether it existed.
    pub fn remove_child(&mut self, name: &str) -> bool {
        self.children
            .remove(name)
            .map_or(false, |child| child.exists())
    }
}
