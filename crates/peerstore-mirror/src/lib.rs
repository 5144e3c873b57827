//! # Peerstore Mirror
//!
//! Host-local mirror of the peer's key-value store.
//!
//! ## Overview
//!
//! The mirror answers reads without a round trip to the peer. It is filled
//! from the peer's initial snapshot and kept current from change
//! notifications. Collaborators read it through the [`MirrorRead`] trait;
//! only the inbound dispatcher writes to it.
//!
//! ## Key Types
//!
//! - [`MirrorStore`] - The mirror itself, guarded by one `RwLock`
//! - [`MirrorRead`] - Read-only view handed to collaborators
//! - [`MirrorError`] - Rejected updates (absorbed by the dispatcher)
//!
//! ## Design Notes
//!
//! - **Three-valued reads**: `Unknown` before the snapshot, then `Absent` or `Present`
//! - **Copy-out snapshots**: [`MirrorRead::all`] returns an owned copy, never a live alias
//! - **Monotone capability**: `Supported` and `Unsupported` are both terminal

pub mod error;
pub mod store;
pub mod traits;

pub use error::{MirrorError, Result};
pub use store::MirrorStore;
pub use traits::MirrorRead;
