//! Proptest generators for property-based testing.

use proptest::prelude::*;

use peerstore_core::{ChangeEvent, CorrelationId};
use peerstore_sync::{Entries, PeerMessage};

/// Generate a key from a small alphabet, so sequences revisit keys.
pub fn key() -> impl Strategy<Value = String> {
    "[a-d]{1,2}".prop_map(String::from)
}

/// Generate a stored value. Empty strings are legal values.
pub fn value() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,6}".prop_map(String::from)
}

/// Generate a snapshot.
pub fn entries(max_len: usize) -> impl Strategy<Value = Entries> {
    prop::collection::btree_map(key(), value(), 0..=max_len)
}

/// Generate a correlation id, including the sentinel and stray negatives.
pub fn correlation() -> impl Strategy<Value = CorrelationId> {
    prop_oneof![
        Just(CorrelationId::NONE),
        (0i64..64).prop_map(CorrelationId::from_raw),
        (i64::MIN..0).prop_map(CorrelationId::from_raw),
    ]
}

/// Generate a change event of any kind.
pub fn change_event() -> impl Strategy<Value = ChangeEvent> {
    prop_oneof![
        1 => Just(ChangeEvent::clear()),
        3 => (key(), prop::option::of(value()))
            .prop_map(|(k, old)| ChangeEvent::remove(k, old)),
        6 => (key(), prop::option::of(value()), value())
            .prop_map(|(k, old, new)| ChangeEvent::update(k, old, new)),
    ]
}

/// Generate a raw change notification, including malformed combinations
/// such as a missing key with a value.
pub fn change_message() -> impl Strategy<Value = PeerMessage> {
    (
        prop::option::of(key()),
        prop::option::of(value()),
        prop::option::of(value()),
    )
        .prop_map(|(key, old_value, new_value)| PeerMessage::Change {
            key,
            old_value,
            new_value,
        })
}

/// Generate any message the peer could send.
pub fn peer_message() -> impl Strategy<Value = PeerMessage> {
    prop_oneof![
        entries(4).prop_map(|entries| PeerMessage::Ready { entries }),
        Just(PeerMessage::ReadyUnsupported),
        (
            correlation(),
            any::<bool>(),
            prop::option::of(key()),
            prop::option::of(value()),
            prop::option::of(value()),
        )
            .prop_map(
                |(correlation, success, key, old_value, new_value)| PeerMessage::Outcome {
                    correlation,
                    success,
                    key,
                    old_value,
                    new_value,
                }
            ),
        change_message(),
        entries(4).prop_map(|entries| PeerMessage::Refresh { entries }),
    ]
}

/// One step of a host/peer session.
#[derive(Debug, Clone)]
pub enum SessionOp {
    /// Host reads a key.
    Get { key: String },
    /// Host writes a key, with or without a handler.
    Set {
        key: String,
        value: String,
        correlated: bool,
    },
    /// Host removes a key, with or without a handler.
    Remove { key: String, correlated: bool },
    /// Host clears the store, with or without a handler.
    Clear { correlated: bool },
    /// Host asks for a snapshot.
    Refresh,
    /// Another context writes or removes a key on the peer.
    External { key: String, value: Option<String> },
    /// Another context clears the peer's store.
    ExternalClear,
}

impl SessionOp {
    /// Whether this op expects exactly one outcome.
    pub fn is_correlated(&self) -> bool {
        match self {
            SessionOp::Get { .. } => true,
            SessionOp::Set { correlated, .. }
            | SessionOp::Remove { correlated, .. }
            | SessionOp::Clear { correlated } => *correlated,
            SessionOp::Refresh | SessionOp::External { .. } | SessionOp::ExternalClear => false,
        }
    }
}

impl Arbitrary for SessionOp {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            3 => key().prop_map(|key| SessionOp::Get { key }),
            4 => (key(), value(), any::<bool>()).prop_map(|(key, value, correlated)| {
                SessionOp::Set {
                    key,
                    value,
                    correlated,
                }
            }),
            2 => (key(), any::<bool>())
                .prop_map(|(key, correlated)| SessionOp::Remove { key, correlated }),
            1 => any::<bool>().prop_map(|correlated| SessionOp::Clear { correlated }),
            1 => Just(SessionOp::Refresh),
            3 => (key(), prop::option::of(value()))
                .prop_map(|(key, value)| SessionOp::External { key, value }),
            1 => Just(SessionOp::ExternalClear),
        ]
        .boxed()
    }
}

/// Generate a session script.
pub fn session_ops(max_len: usize) -> impl Strategy<Value = Vec<SessionOp>> {
    prop::collection::vec(any::<SessionOp>(), 0..=max_len)
}
