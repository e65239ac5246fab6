//! RecordId - content hash of an immutable tree record
//!
//! Every node in the tree is identified by the SHA-256 digest of its
//! properties and of the ids of its children. Two records with the same
//! id have the same content, so identity comparison doubles as a deep
//! equality check.

use std::fmt;

use sha2::{Digest, Sha256};

use super::property::PropertyValue;

/// Tag bytes mixed into the digest so that differently shaped records
/// can never collide on the same byte stream.
const TAG_MISSING: u8 = b'M';
const TAG_NODE: u8 = b'N';
const TAG_PROPERTY: u8 = b'P';
const TAG_CHILD: u8 = b'C';

/// A 32-byte content hash identifying a tree record.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; 32]);

impl RecordId {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex representation.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    /// Abbreviated form used in log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }

    /// Id of the "missing node" sentinel.
    pub(crate) fn missing() -> Self {
        let mut hasher = Sha256::new();
        hasher.update([TAG_MISSING]);
        Self(hasher.finalize().into())
    }

    /// Computes the id of an existing node from its sorted contents.
    pub(crate) fn compute<'a, P, C>(properties: P, children: C) -> Self
    where
        P: IntoIterator<Item = (&'a String, &'a PropertyValue)>,
        C: IntoIterator<Item = (&'a String, RecordId)>,
    {
        let mut hasher = Sha256::new();
        hasher.update([TAG_NODE]);

        for (name, value) in properties {
            hasher.update([TAG_PROPERTY]);
            update_str(&mut hasher, name);
            hasher.update([value.type_tag()]);
            match value {
                PropertyValue::String(s) => update_str(&mut hasher, s),
                PropertyValue::Long(v) => hasher.update(v.to_le_bytes()),
                PropertyValue::Boolean(b) => hasher.update([u8::from(*b)]),
            }
        }

        for (name, id) in children {
            hasher.update([TAG_CHILD]);
            update_str(&mut hasher, name);
            hasher.update(id.0);
        }

        Self(hasher.finalize().into())
    }
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn props(pairs: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_same_content_same_id() {
        let a = props(&[("x", PropertyValue::Long(1))]);
        let b = props(&[("x", PropertyValue::Long(1))]);
        assert_eq!(
            RecordId::compute(&a, std::iter::empty()),
            RecordId::compute(&b, std::iter::empty())
        );
    }

    #[test]
    fn test_type_is_part_of_identity() {
        let long = props(&[("x", PropertyValue::Long(1))]);
        let string = props(&[("x", PropertyValue::String("1".into()))]);
        assert_ne!(
            RecordId::compute(&long, std::iter::empty()),
            RecordId::compute(&string, std::iter::empty())
        );
    }

    #[test]
    fn test_missing_differs_from_empty() {
        let empty: BTreeMap<String, PropertyValue> = BTreeMap::new();
        assert_ne!(RecordId::missing(), RecordId::compute(&empty, std::iter::empty()));
    }

    #[test]
    fn test_hex_format() {
        let id = RecordId::from_bytes([0xab; 32]);
        assert_eq!(id.to_hex().len(), 64);
        assert!(id.to_hex().starts_with("abab"));
        assert_eq!(id.short(), "abababababab");
        assert_eq!(format!("{}", id), id.to_hex());
    }
}
