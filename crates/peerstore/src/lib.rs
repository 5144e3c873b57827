//! # PeerStore
//!
//! Host-side access to a key-value store that lives inside a remote,
//! untrusted peer, reachable only by asynchronous messages.
//!
//! ## Overview
//!
//! The PeerStore keeps three things straight for the host:
//!
//! - **Requests**: Reads and writes go out over the link. A request with a
//!   handler is correlated; its outcome is delivered exactly once.
//! - **Mirror**: A local copy of the peer's store, seeded by the handshake
//!   and kept current by outcomes, change notifications and refreshes.
//! - **Readiness**: Nothing is sent until the peer attaches. Intents made
//!   earlier are queued and run in order once it does.
//!
//! ## Key Concepts
//!
//! - **Capability**: Unknown until the handshake, then Supported or
//!   Unsupported for the rest of the session.
//! - **Lookup**: Mirror reads are three-valued. `Unknown` means the mirror
//!   has nothing to say, `Absent` means the peer has no such key.
//! - **Fire-and-forget**: Writes without a handler carry the sentinel
//!   correlation id and never produce an outcome.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use peerstore::{PeerStore, PeerStoreConfig};
//! use peerstore::sync::memory;
//!
//! async fn example() {
//!     let (outbound, inbound, _peer) = memory::link();
//!     let store = PeerStore::new(outbound, PeerStoreConfig::default()).unwrap();
//!
//!     store.set_item("theme", "dark", None);
//!     store.get_item("theme", |outcome| {
//!         println!("{:?}", outcome.item());
//!     });
//!
//!     store.run(inbound).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `peerstore::core` - Core values (CorrelationId, ChangeEvent, Outcome, etc.)
//! - `peerstore::mirror` - The local mirror
//! - `peerstore::sync` - Wire messages, transport and inbound dispatch

pub mod error;
pub mod store;

// Re-export component crates
pub use peerstore_core as core;
pub use peerstore_mirror as mirror;
pub use peerstore_sync as sync;

// Re-export main types for convenience
pub use error::{PeerStoreError, Result};
pub use store::{PeerStore, PeerStoreConfig};

// Re-export commonly used types
pub use peerstore_core::{
    Capability, ChangeEvent, ChangeKind, CorrelationId, Lookup, Outcome, Readiness, StoreItem,
};
pub use peerstore_sync::{handler, CompletionHandler, Disposition, PeerMessage, PeerRequest};
