//! Read-side view of a stored checkpoint

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::layout::{CREATED, PROPERTIES, TIMESTAMP};
use crate::tree::NodeState;

/// Metadata of one checkpoint, as stored under `checkpoints/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub name: String,
    /// Creation time, epoch millis
    pub created: i64,
    /// Expiry, epoch millis
    pub expires: i64,
    /// Caller metadata given at creation
    pub properties: BTreeMap<String, String>,
}

impl CheckpointInfo {
    /// Reads the checkpoint stored in `node`. Missing numeric fields read as 0.
    pub(crate) fn from_node(name: &str, node: &NodeState) -> Self {
        let properties = node
            .child_node(PROPERTIES)
            .properties()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.to_string(), v.to_string())))
            .collect();
        Self {
            name: name.to_string(),
            created: node.long(CREATED).unwrap_or(0),
            expires: node.long(TIMESTAMP).unwrap_or(0),
            properties,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires <= now
    }
}

/// A checkpoint is swept when its expiry is missing, not a long, or past.
pub(crate) fn is_sweepable(node: &NodeState, now: i64) -> bool {
    match node.long(TIMESTAMP) {
        Some(expires) => now > expires,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(timestamp: Option<i64>) -> NodeState {
        let mut builder = NodeState::empty().builder();
        if let Some(ts) = timestamp {
            builder.set_property(TIMESTAMP, ts);
        }
        builder.set_property(CREATED, 10i64);
        builder.child(PROPERTIES).set_property("a", "b");
        builder.node_state()
    }

    #[test]
    fn test_from_node() {
        let info = CheckpointInfo::from_node("cp", &checkpoint(Some(1_000)));
        assert_eq!(info.name, "cp");
        assert_eq!(info.created, 10);
        assert_eq!(info.expires, 1_000);
        assert_eq!(info.properties.get("a").map(String::as_str), Some("b"));
        assert!(!info.is_expired(999));
        assert!(info.is_expired(1_000));
    }

    #[test]
    fn test_sweep_rules() {
        assert!(is_sweepable(&checkpoint(None), 0));
        assert!(is_sweepable(&checkpoint(Some(5)), 6));
        assert!(!is_sweepable(&checkpoint(Some(5)), 5));

        let mut builder = NodeState::empty().builder();
        builder.set_property(TIMESTAMP, "tomorrow");
        assert!(is_sweepable(&builder.node_state(), 0));
    }

    #[test]
    fn test_serializes() {
        let info = CheckpointInfo::from_node("cp", &checkpoint(Some(1)));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["name"], "cp");
        assert_eq!(json["properties"]["a"], "b");
    }
}
