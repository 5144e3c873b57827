//! Store items and per-call outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A key with its value before and after an operation.
///
/// For a read, `old_value` is always absent and `value` is what the peer
/// holds. For a clear, the key is absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreItem {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub value: Option<String>,
}

impl StoreItem {
    pub fn new(key: Option<String>, old_value: Option<String>, value: Option<String>) -> Self {
        Self {
            key,
            old_value,
            value,
        }
    }
}

impl fmt::Display for StoreItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreItem [key={:?}, old_value={:?}, value={:?}]",
            self.key, self.old_value, self.value
        )
    }
}

/// Result of one correlated request, delivered to its completion handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer executed the request.
    Success(StoreItem),
    /// The peer could not execute the request. Only the key is reported.
    Error { key: Option<String> },
}

impl Outcome {
    /// Build an outcome from the fields of an inbound outcome message.
    pub fn from_parts(
        success: bool,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        if success {
            Outcome::Success(StoreItem::new(key, old_value, new_value))
        } else {
            Outcome::Error { key }
        }
    }

    /// A failed outcome for `key`.
    pub fn failed(key: Option<String>) -> Self {
        Outcome::Error { key }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The key the outcome refers to.
    pub fn key(&self) -> Option<&str> {
        match self {
            Outcome::Success(item) => item.key.as_deref(),
            Outcome::Error { key } => key.as_deref(),
        }
    }

    /// The item, for successful outcomes.
    pub fn item(&self) -> Option<&StoreItem> {
        match self {
            Outcome::Success(item) => Some(item),
            Outcome::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_drops_values() {
        let outcome = Outcome::from_parts(
            false,
            Some("k".into()),
            Some("old".into()),
            Some("new".into()),
        );
        assert_eq!(outcome, Outcome::Error { key: Some("k".into()) });
        assert!(outcome.item().is_none());
        assert_eq!(outcome.key(), Some("k"));
    }

    #[test]
    fn test_success_outcome_keeps_item() {
        let outcome = Outcome::from_parts(true, Some("k".into()), None, Some("v1".into()));
        assert!(outcome.is_success());
        let item = outcome.item().unwrap();
        assert_eq!(item.value.as_deref(), Some("v1"));
        assert_eq!(item.old_value, None);
    }

    #[test]
    fn test_item_display() {
        let item = StoreItem::new(Some("k".into()), None, Some("v".into()));
        assert_eq!(
            item.to_string(),
            "StoreItem [key=Some(\"k\"), old_value=None, value=Some(\"v\")]"
        );
    }
}
