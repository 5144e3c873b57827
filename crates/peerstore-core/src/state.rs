//! Capability and readiness of a host-side instance.
//!
//! Both are monotone: they settle once, on the first handshake, and never
//! move back.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Whether the peer can host a store at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Capability {
    /// The peer has not reported yet.
    #[default]
    Unknown,
    /// The peer reported that it cannot host a store.
    Unsupported,
    /// The peer hosts a store and sent its initial snapshot.
    Supported,
}

impl Capability {
    /// Whether the capability has been settled by a handshake.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Capability::Unknown)
    }

    /// Settle an unknown capability.
    ///
    /// Settling to the same value again is accepted; flipping a settled
    /// capability is an error.
    pub fn settle(&mut self, to: Capability) -> Result<(), CoreError> {
        match (*self, to) {
            (Capability::Unknown, _) => {
                *self = to;
                Ok(())
            }
            (current, to) if current == to => Ok(()),
            (current, _) => Err(CoreError::CapabilitySettled(current)),
        }
    }
}

/// Readiness of a host-side instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Readiness {
    #[default]
    Pending,
    Ready,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Result of a mirror read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The mirror has no snapshot yet (or never will, when unsupported).
    Unknown,
    /// The mirror is initialized and the key is not present.
    Absent,
    /// The mirrored value.
    Present(String),
}

impl Lookup {
    /// The value, if present.
    pub fn value(&self) -> Option<&str> {
        match self {
            Lookup::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Lookup::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_settles_once() {
        let mut cap = Capability::default();
        assert!(!cap.is_settled());

        cap.settle(Capability::Unsupported).unwrap();
        assert!(cap.is_settled());
        cap.settle(Capability::Unsupported).unwrap();

        let err = cap.settle(Capability::Supported).unwrap_err();
        assert_eq!(err, CoreError::CapabilitySettled(Capability::Unsupported));
        assert_eq!(cap, Capability::Unsupported);
    }

    #[test]
    fn test_lookup_value() {
        assert_eq!(Lookup::Present("v".into()).value(), Some("v"));
        assert_eq!(Lookup::Absent.value(), None);
        assert!(Lookup::Unknown.is_unknown());
    }
}
