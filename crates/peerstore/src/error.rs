//! Error types for the PeerStore.

use peerstore_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during PeerStore operations.
///
/// Peer misbehaviour never shows up here; it is absorbed by the dispatcher.
#[derive(Debug, Error)]
pub enum PeerStoreError {
    /// The peer link failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

impl PeerStoreError {
    /// Whether the peer link has gone away.
    pub fn is_closed(&self) -> bool {
        matches!(self, PeerStoreError::Sync(SyncError::Closed))
    }
}

/// Result type for PeerStore operations.
pub type Result<T> = std::result::Result<T, PeerStoreError>;
