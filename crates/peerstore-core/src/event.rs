//! Change events and their classification.
//!
//! A change event is the raw `(key, old, new)` triple the peer reports when
//! its store is mutated, plus a kind derived from the nullness of the triple:
//!
//! | key    | new value | kind     |
//! |--------|-----------|----------|
//! | absent | any       | `Clear`  |
//! | set    | absent    | `Remove` |
//! | set    | set       | `Update` |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified type of a store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Every key was removed.
    Clear,
    /// One key was removed.
    Remove,
    /// One key was inserted or overwritten.
    Update,
}

impl ChangeKind {
    /// Derive the kind of a raw change triple.
    pub fn classify(key: Option<&str>, new_value: Option<&str>) -> Self {
        match (key, new_value) {
            (None, _) => ChangeKind::Clear,
            (Some(_), None) => ChangeKind::Remove,
            (Some(_), Some(_)) => ChangeKind::Update,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Clear => write!(f, "clear"),
            ChangeKind::Remove => write!(f, "remove"),
            ChangeKind::Update => write!(f, "update"),
        }
    }
}

/// A classified change to the peer's store.
///
/// The kind is computed at construction and cannot disagree with the
/// triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    key: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    kind: ChangeKind,
}

impl ChangeEvent {
    /// Build and classify a change event.
    pub fn new(key: Option<String>, old_value: Option<String>, new_value: Option<String>) -> Self {
        let kind = ChangeKind::classify(key.as_deref(), new_value.as_deref());
        Self {
            key,
            old_value,
            new_value,
            kind,
        }
    }

    /// A full clear.
    pub fn clear() -> Self {
        Self::new(None, None, None)
    }

    /// Removal of one key.
    pub fn remove(key: impl Into<String>, old_value: Option<String>) -> Self {
        Self::new(Some(key.into()), old_value, None)
    }

    /// Insertion or overwrite of one key.
    pub fn update(
        key: impl Into<String>,
        old_value: Option<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self::new(Some(key.into()), old_value, Some(new_value.into()))
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} key={:?} old={:?} new={:?}",
            self.kind, self.key, self.old_value, self.new_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_null_key_is_clear() {
        let event = ChangeEvent::new(None, None, None);
        assert_eq!(event.kind(), ChangeKind::Clear);

        // A clear stays a clear even if the peer sends stray values.
        let event = ChangeEvent::new(None, Some("x".into()), Some("y".into()));
        assert_eq!(event.kind(), ChangeKind::Clear);
    }

    #[test]
    fn test_null_new_value_is_remove() {
        let event = ChangeEvent::new(Some("a".into()), Some("1".into()), None);
        assert_eq!(event.kind(), ChangeKind::Remove);
        assert_eq!(event.key(), Some("a"));
        assert_eq!(event.old_value(), Some("1"));
    }

    #[test]
    fn test_set_new_value_is_update() {
        let event = ChangeEvent::update("k", Some("v1".into()), "v2");
        assert_eq!(event.kind(), ChangeKind::Update);
        assert_eq!(event.new_value(), Some("v2"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ChangeEvent::clear().kind().to_string(), "clear");
        assert_eq!(ChangeEvent::remove("a", None).kind().to_string(), "remove");
    }

    proptest! {
        #[test]
        fn classification_invariants(
            key in proptest::option::of("[a-z]{1,8}"),
            old in proptest::option::of("[a-z0-9]{0,8}"),
            new in proptest::option::of("[a-z0-9]{0,8}"),
        ) {
            let event = ChangeEvent::new(key, old, new);
            match event.kind() {
                ChangeKind::Update => prop_assert!(event.new_value().is_some() && event.key().is_some()),
                ChangeKind::Remove => prop_assert!(event.key().is_some() && event.new_value().is_none()),
                ChangeKind::Clear => prop_assert!(event.key().is_none()),
            }
        }
    }
}
