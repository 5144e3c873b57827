//! Read-only access to a mirror.
//!
//! Collaborators that render or inspect the mirror get this view; only the
//! dispatcher holds the concrete [`MirrorStore`](crate::MirrorStore) and
//! mutates it.

use std::collections::BTreeMap;

use peerstore_core::{Capability, Lookup};

/// Read-only view of a host-local mirror.
pub trait MirrorRead: Send + Sync {
    /// Look up one key.
    ///
    /// Returns [`Lookup::Unknown`] until the peer has sent a snapshot.
    fn get(&self, key: &str) -> Lookup;

    /// Copy of every mirrored entry, or `None` while uninitialized.
    fn all(&self) -> Option<BTreeMap<String, String>>;

    /// The capability reported by the peer.
    fn capability(&self) -> Capability;

    /// Number of mirrored entries (zero while uninitialized).
    fn len(&self) -> usize {
        self.all().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the mirror holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
