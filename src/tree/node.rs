//! NodeState - immutable, structurally shared tree node

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::builder::NodeBuilder;
use super::property::PropertyValue;
use super::record_id::RecordId;

/// An immutable tree node.
///
/// Cloning is cheap (one reference count). Subtrees are shared between
/// every snapshot that contains them, and each node carries the content
/// hash computed when it was built.
#[derive(Clone)]
pub struct NodeState {
    record: Arc<NodeRecord>,
}

struct NodeRecord {
    exists: bool,
    properties: BTreeMap<String, PropertyValue>,
    children: BTreeMap<String, NodeState>,
    id: RecordId,
}

impl NodeState {
    /// An existing node without properties or children.
    pub fn empty() -> NodeState {
        static EMPTY: OnceLock<NodeState> = OnceLock::new();
        EMPTY
            .get_or_init(|| NodeState::from_parts(BTreeMap::new(), BTreeMap::new()))
            .clone()
    }

    /// The sentinel returned for children that do not exist.
    pub fn missing() -> NodeState {
        static MISSING: OnceLock<NodeState> = OnceLock::new();
        MISSING
            .get_or_init(|| NodeState {
                record: Arc::new(NodeRecord {
                    exists: false,
                    properties: BTreeMap::new(),
                    children: BTreeMap::new(),
                    id: RecordId::missing(),
                }),
            })
            .clone()
    }

    /// Builds a node from its parts. Non-existent children are dropped.
    pub(crate) fn from_parts(
        properties: BTreeMap<String, PropertyValue>,
        mut children: BTreeMap<String, NodeState>,
    ) -> NodeState {
        children.retain(|_, child| child.exists());
        let id = RecordId::compute(
            &properties,
            children.iter().map(|(name, child)| (name, child.id())),
        );
        NodeState {
            record: Arc::new(NodeRecord {
                exists: true,
                properties,
                children,
                id,
            }),
        }
    }

    /// Content hash of this node.
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    pub fn exists(&self) -> bool {
        self.record.exists
    }

    /// Identity comparison: same record, or same content hash.
    pub fn fast_equals(a: &NodeState, b: &NodeState) -> bool {
        Arc::ptr_eq(&a.record, &b.record) || a.record.id == b.record.id
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.record.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.record.properties.get(name)
    }

    /// Value of a LONG property, `None` if absent or of another type.
    pub fn long(&self, name: &str) -> Option<i64> {
        self.property(name).and_then(PropertyValue::as_long)
    }

    /// Value of a STRING property, `None` if absent or of another type.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValue::as_str)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.record
            .properties
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn property_count(&self) -> usize {
        self.record.properties.len()
    }

    pub fn has_child_node(&self, name: &str) -> bool {
        self.record.children.contains_key(name)
    }

    /// The named child, or [`NodeState::missing`] if there is none.
    pub fn child_node(&self, name: &str) -> NodeState {
        self.record
            .children
            .get(name)
            .cloned()
            .unwrap_or_else(NodeState::missing)
    }

    pub fn child_node_names(&self) -> impl Iterator<Item = &str> {
        self.record.children.keys().map(String::as_str)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &NodeState)> {
        self.record
            .children
            .iter()
            .map(|(name, child)| (name.as_str(), child))
    }

    pub fn child_node_count(&self) -> usize {
        self.record.children.len()
    }

    /// A staging builder seeded from this node.
    pub fn builder(&self) -> NodeBuilder {
        NodeBuilder::new(self.clone())
    }

    pub(crate) fn property_map(&self) -> &BTreeMap<String, PropertyValue> {
        &self.record.properties
    }

    pub(crate) fn child_map(&self) -> &BTreeMap<String, NodeState> {
        &self.record.children
    }
}

impl PartialEq for NodeState {
    fn eq(&self, other: &Self) -> bool {
        NodeState::fast_equals(self, other)
    }
}

impl Eq for NodeState {}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exists() {
            return write!(f, "NodeState(missing)");
        }
        f.debug_struct("NodeState")
            .field("id", &self.id())
            .field("properties", &self.record.properties)
            .field(
                "children",
                &self.record.children.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
