//! Error types for peerstore core.

use thiserror::Error;

/// Core errors that can occur when working with primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("the correlation id space is exhausted")]
    CorrelationExhausted,

    #[error("the fire-and-forget sentinel has no successor")]
    SentinelArithmetic,

    #[error("capability already settled as {0:?}")]
    CapabilitySettled(crate::state::Capability),
}
