//! # Peerstore Sync
//!
//! Correlation and mirror synchronization between a host and the peer that
//! owns a key-value store.
//!
//! ## Overview
//!
//! The host never waits on the peer. Requests are handed off with a
//! one-shot correlation id (or none, for fire-and-forget), and the peer's
//! outcomes, change notifications and snapshots come back through a single
//! inbound path that resolves handlers, updates the mirror and raises
//! events.
//!
//! ## Key Properties
//!
//! - **Resolve once**: a correlation id is consumed by at most one outcome
//! - **Gated until ready**: host actions issued before the handshake run in order, before `Ready` is raised
//! - **Absorbing**: stale ids, duplicate handshakes and early messages are dropped, never surfaced
//! - **Ordered**: inbound messages are processed in arrival order
//!
//! ## Message Flow
//!
//! ```text
//! Host                                Peer
//!   |-------- Attach ----------------->|
//!   |<------- Ready / ReadyUnsupported |
//!   |-------- Get / Set / Clear ------>|
//!   |<------- Outcome -----------------|
//!   |<------- Change ------------------|   (external mutation, live update on)
//!   |-------- Refresh ---------------->|
//!   |<------- Refresh -----------------|
//! ```

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gate;
pub mod messages;
pub mod proxy;
pub mod registry;
pub mod transport;

pub use dispatcher::{DispatcherConfig, Disposition, DropReason, InboundDispatcher};
pub use error::{Result, SyncError};
pub use events::{EventBus, EventKind, Listener, StoreEvent, SubscriptionId};
pub use gate::{Action, ReadyGate};
pub use messages::{Entries, PeerMessage, PeerRequest, PROTOCOL_VERSION};
pub use proxy::RemoteProxy;
pub use registry::{handler, CompletionHandler, CorrelationRegistry};
pub use transport::{
    memory::{self, link, MemoryInbound, MemoryOutbound, PeerLink},
    Inbound, Outbound,
};
