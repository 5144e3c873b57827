//! Peer protocol message types.
//!
//! These messages cross the boundary between the host and the peer that
//! owns the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use peerstore_core::{CorrelationId, Outcome};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Entries of a snapshot, ordered by key.
pub type Entries = BTreeMap<String, String>;

/// Host to peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    /// Opens a session. The peer answers with exactly one handshake.
    Attach {
        /// Whether the peer should emit change notifications.
        live_update: bool,
        /// Whether the peer should act as if it had no store.
        simulate_unsupported: bool,
    },

    /// Read one key.
    Get {
        key: String,
        correlation: CorrelationId,
    },

    /// Write one key. An absent value removes the key.
    Set {
        key: String,
        value: Option<String>,
        correlation: CorrelationId,
    },

    /// Remove every key.
    Clear { correlation: CorrelationId },

    /// Ask for a full snapshot.
    Refresh,

    /// Start or stop change notifications.
    SetLiveUpdate { enabled: bool },
}

impl PeerRequest {
    /// The correlation id carried by this request, if any.
    pub fn correlation(&self) -> CorrelationId {
        match self {
            PeerRequest::Get { correlation, .. }
            | PeerRequest::Set { correlation, .. }
            | PeerRequest::Clear { correlation } => *correlation,
            PeerRequest::Attach { .. }
            | PeerRequest::Refresh
            | PeerRequest::SetLiveUpdate { .. } => CorrelationId::NONE,
        }
    }

    /// Short name for logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            PeerRequest::Attach { .. } => "attach",
            PeerRequest::Get { .. } => "get",
            PeerRequest::Set { value: None, .. } => "remove",
            PeerRequest::Set { .. } => "set",
            PeerRequest::Clear { .. } => "clear",
            PeerRequest::Refresh => "refresh",
            PeerRequest::SetLiveUpdate { .. } => "set_live_update",
        }
    }
}

/// Peer to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Handshake: the peer hosts a store. Carries the initial snapshot.
    Ready { entries: Entries },

    /// Handshake: the peer cannot host a store.
    ReadyUnsupported,

    /// Result of one correlated request.
    Outcome {
        correlation: CorrelationId,
        success: bool,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    },

    /// Unsolicited change. An absent key denotes a full clear.
    Change {
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    },

    /// Full snapshot sent in answer to [`PeerRequest::Refresh`].
    Refresh { entries: Entries },
}

impl PeerMessage {
    /// Build an outcome message for `correlation`.
    pub fn outcome(correlation: CorrelationId, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success(item) => PeerMessage::Outcome {
                correlation,
                success: true,
                key: item.key.clone(),
                old_value: item.old_value.clone(),
                new_value: item.value.clone(),
            },
            Outcome::Error { key } => PeerMessage::Outcome {
                correlation,
                success: false,
                key: key.clone(),
                old_value: None,
                new_value: None,
            },
        }
    }

    /// Short name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PeerMessage::Ready { .. } => "ready",
            PeerMessage::ReadyUnsupported => "ready_unsupported",
            PeerMessage::Outcome { .. } => "outcome",
            PeerMessage::Change { .. } => "change",
            PeerMessage::Refresh { .. } => "refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerstore_core::StoreItem;

    #[test]
    fn test_request_correlation() {
        let id = CorrelationId::from_raw(3);
        let get = PeerRequest::Get {
            key: "k".into(),
            correlation: id,
        };
        assert_eq!(get.correlation(), id);
        assert_eq!(PeerRequest::Refresh.correlation(), CorrelationId::NONE);
    }

    #[test]
    fn test_set_without_value_is_a_remove() {
        let req = PeerRequest::Set {
            key: "k".into(),
            value: None,
            correlation: CorrelationId::NONE,
        };
        assert_eq!(req.op_name(), "remove");
    }

    #[test]
    fn test_error_outcome_message_carries_key_only() {
        let msg = PeerMessage::outcome(
            CorrelationId::FIRST,
            &Outcome::Error {
                key: Some("k".into()),
            },
        );
        assert_eq!(
            msg,
            PeerMessage::Outcome {
                correlation: CorrelationId::FIRST,
                success: false,
                key: Some("k".into()),
                old_value: None,
                new_value: None,
            }
        );
    }

    #[test]
    fn test_success_outcome_message() {
        let item = StoreItem::new(Some("k".into()), Some("a".into()), Some("b".into()));
        let msg = PeerMessage::outcome(CorrelationId::FIRST, &Outcome::Success(item));
        match msg {
            PeerMessage::Outcome {
                success,
                old_value,
                new_value,
                ..
            } => {
                assert!(success);
                assert_eq!(old_value.as_deref(), Some("a"));
                assert_eq!(new_value.as_deref(), Some("b"));
            }
            other => panic!("expected Outcome, got {:?}", other),
        }
    }
}
