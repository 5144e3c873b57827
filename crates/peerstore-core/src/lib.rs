//! # Peerstore Core
//!
//! Pure primitives for peerstore: correlation ids, change events, outcomes,
//! and the monotone capability/readiness states of a host-side instance.
//!
//! This crate contains no I/O, no locking, no networking.
//!
//! ## Key Types
//!
//! - [`CorrelationId`] - One-shot id pairing a request with its outcome
//! - [`ChangeEvent`] - A classified `(key, old, new)` change to the peer's store
//! - [`ChangeKind`] - `Clear`, `Remove` or `Update`
//! - [`Outcome`] - Result of one correlated request
//! - [`Capability`] / [`Readiness`] - Settled once, on the first handshake

pub mod error;
pub mod event;
pub mod item;
pub mod state;
pub mod types;

pub use error::CoreError;
pub use event::{ChangeEvent, ChangeKind};
pub use item::{Outcome, StoreItem};
pub use state::{Capability, Lookup, Readiness};
pub use types::{CorrelationId, InstanceId};
