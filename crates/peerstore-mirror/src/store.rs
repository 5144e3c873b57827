//! The host-local mirror of the peer's store.
//!
//! Every mutation happens under a single write lock, so a reader never sees
//! a half-applied change.

use std::collections::BTreeMap;
use std::sync::RwLock;

use peerstore_core::{Capability, ChangeEvent, ChangeKind, Lookup};

use crate::error::{MirrorError, Result};
use crate::traits::MirrorRead;

/// Host-local copy of every key/value pair the peer holds.
///
/// Starts uninitialized. The first snapshot marks the capability
/// `Supported`; [`MirrorStore::mark_unsupported`] marks it `Unsupported` and
/// leaves the mirror uninitialized for good.
pub struct MirrorStore {
    inner: RwLock<MirrorInner>,
}

struct MirrorInner {
    capability: Capability,

    /// `None` until the first snapshot.
    entries: Option<BTreeMap<String, String>>,
}

impl MirrorStore {
    /// Create a new, uninitialized mirror.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MirrorInner {
                capability: Capability::Unknown,
                entries: None,
            }),
        }
    }

    /// Replace the whole mirror with `entries` and mark it supported.
    pub fn snapshot_from(&self, entries: BTreeMap<String, String>) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let current = inner.capability;
        inner
            .capability
            .settle(Capability::Supported)
            .map_err(|_| MirrorError::CapabilityLocked(current))?;

        tracing::trace!(entries = entries.len(), "mirror snapshot applied");
        inner.entries = Some(entries);
        Ok(())
    }

    /// Mark the peer as unable to host a store.
    pub fn mark_unsupported(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let current = inner.capability;
        inner
            .capability
            .settle(Capability::Unsupported)
            .map_err(|_| MirrorError::CapabilityLocked(current))?;

        inner.entries = None;
        Ok(())
    }

    /// Apply one classified change.
    pub fn apply_change(&self, event: &ChangeEvent) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let entries = inner.entries.as_mut().ok_or(MirrorError::Uninitialized)?;

        match (event.kind(), event.key(), event.new_value()) {
            (ChangeKind::Clear, _, _) => entries.clear(),
            (ChangeKind::Remove, Some(key), _) => {
                entries.remove(key);
            }
            (ChangeKind::Update, Some(key), Some(value)) => {
                entries.insert(key.to_owned(), value.to_owned());
            }
            // Unreachable by construction of ChangeEvent.
            (ChangeKind::Remove, None, _) | (ChangeKind::Update, _, _) => {}
        }

        tracing::trace!(kind = %event.kind(), key = ?event.key(), "mirror change applied");
        Ok(())
    }

    /// Whether a snapshot has been applied.
    pub fn is_initialized(&self) -> bool {
        self.inner.read().unwrap().entries.is_some()
    }
}

impl Default for MirrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorRead for MirrorStore {
    fn get(&self, key: &str) -> Lookup {
        let inner = self.inner.read().unwrap();
        match &inner.entries {
            None => Lookup::Unknown,
            Some(entries) => match entries.get(key) {
                Some(value) => Lookup::Present(value.clone()),
                None => Lookup::Absent,
            },
        }
    }

    fn all(&self) -> Option<BTreeMap<String, String>> {
        let inner = self.inner.read().unwrap();
        inner.entries.clone()
    }

    fn capability(&self) -> Capability {
        self.inner.read().unwrap().capability
    }

    fn len(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.entries.as_ref().map(BTreeMap::len).unwrap_or(0)
    }
}
