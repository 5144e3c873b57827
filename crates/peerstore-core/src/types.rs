//! Strong type definitions for peerstore.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// One-shot identifier correlating an outbound request with the peer's
/// per-call outcome.
///
/// Ids are non-negative and assigned in increasing order by the host. The
/// reserved value [`CorrelationId::NONE`] (`-1` on the wire) marks a
/// fire-and-forget request and is never looked up.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct CorrelationId(i64);

impl CorrelationId {
    /// Sentinel for "no completion handler requested".
    pub const NONE: Self = Self(-1);

    /// The first id handed out by a fresh registry.
    pub const FIRST: Self = Self(0);

    /// Create an id from its wire value.
    ///
    /// Any negative value is folded into [`CorrelationId::NONE`].
    pub const fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::NONE
        } else {
            Self(raw)
        }
    }

    /// Get the wire value.
    pub const fn as_raw(&self) -> i64 {
        self.0
    }

    /// Whether this is the fire-and-forget sentinel.
    pub const fn is_none(&self) -> bool {
        self.0 < 0
    }

    /// The id following this one.
    pub fn next(&self) -> Result<Self, CoreError> {
        if self.is_none() {
            return Err(CoreError::SentinelArithmetic);
        }
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(CoreError::CorrelationExhausted)
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "CorrelationId(none)")
        } else {
            write!(f, "CorrelationId({})", self.0)
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CorrelationId {
    fn from(raw: i64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<CorrelationId> for i64 {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

/// Random identity of one host-side instance.
///
/// Only used to tell the logs of concurrent sessions apart.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub [u8; 8]);

impl InstanceId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Generate a random instance id.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.to_hex())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
