//! Error types for the mirror module.

use peerstore_core::Capability;
use thiserror::Error;

/// Errors that can occur when updating the mirror.
///
/// None of these reach the host: the dispatcher logs and absorbs them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    /// The capability was already settled the other way.
    #[error("capability is locked as {0:?}")]
    CapabilityLocked(Capability),

    /// A change arrived before any snapshot.
    #[error("mirror is not initialized")]
    Uninitialized,
}

/// Result type for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;
