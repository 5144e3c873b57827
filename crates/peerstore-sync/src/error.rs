//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// Only transport and codec failures surface to callers. Protocol anomalies
/// from the peer are logged and absorbed by the dispatcher.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Frame was produced by a different protocol version.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// Message could not be decoded or encoded.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The peer link is closed.
    #[error("peer link closed")]
    Closed,

    /// Correlation ids ran out for this instance.
    #[error("correlation error: {0}")]
    Correlation(#[from] peerstore_core::CoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
