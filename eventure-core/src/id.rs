//! Opaque aggregate/saga identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque identifier, preserved verbatim wherever it travels through the
/// runtime (as `Message::aggregate_id`, `Message::saga_id`, storage keys,
/// bus routing, ...).
///
/// Storage backends mint these (`EventStorage::get_new_id`); the core never
/// interprets their contents, only compares and clones them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// A string identifier, e.g. a UUID rendered as text.
    String(String),
    /// An integer identifier, e.g. an auto-incrementing row id.
    Int(i64),
}

impl Id {
    /// Borrows the string form, if this is a [`Id::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Id::String(s) => Some(s.as_str()),
            Id::Int(_) => None,
        }
    }

    /// Returns the integer form, if this is a [`Id::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Id::Int(i) => Some(*i),
            Id::String(_) => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => f.write_str(s),
            Id::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_owned())
    }
}

impl From<i64> for Id {
    fn from(i: i64) -> Self {
        Id::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_untagged() {
        let s = Id::from("a1");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"a1\"");
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), s);

        let i = Id::from(42i64);
        let json = serde_json::to_string(&i).unwrap();
        assert_eq!(json, "42");
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), i);
    }

    #[test]
    fn display_matches_verbatim_contents() {
        assert_eq!(Id::from("order-1").to_string(), "order-1");
        assert_eq!(Id::from(7i64).to_string(), "7");
    }
}
