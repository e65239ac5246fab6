//! Typed property values stored on tree nodes

use std::fmt;

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Boolean(bool),
}

impl PropertyValue {
    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "STRING",
            PropertyValue::Long(_) => "LONG",
            PropertyValue::Boolean(_) => "BOOLEAN",
        }
    }

    pub(crate) fn type_tag(&self) -> u8 {
        match self {
            PropertyValue::String(_) => 1,
            PropertyValue::Long(_) => 2,
            PropertyValue::Boolean(_) => 3,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Long(v) => write!(f, "{}", v),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        assert_eq!(PropertyValue::from("a").as_str(), Some("a"));
        assert_eq!(PropertyValue::from(7i64).as_long(), Some(7));
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from("7").as_long(), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(PropertyValue::from(1i64).type_name(), "LONG");
        assert_eq!(PropertyValue::from("x").type_name(), "STRING");
        assert_eq!(PropertyValue::from(false).type_name(), "BOOLEAN");
    }
}
