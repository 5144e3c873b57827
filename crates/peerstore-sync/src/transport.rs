//! Transport abstraction for the peer boundary.
//!
//! The host hands requests off through a synchronous [`Outbound`] sink (a
//! hand-off never blocks or suspends the caller) and consumes peer messages
//! from an async [`Inbound`] source. Implementations may use WebSockets,
//! a browser bridge, or any other link.

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{PeerMessage, PeerRequest};

/// Non-blocking sink for host requests.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait Outbound: Send + Sync {
    /// Hand a request to the link. Must return without waiting on the peer.
    fn send(&self, request: PeerRequest) -> Result<()>;
}

/// Source of peer messages, in arrival order.
#[async_trait]
pub trait Inbound: Send {
    /// Receive the next message.
    ///
    /// Returns [`SyncError::Closed`](crate::SyncError::Closed) once the
    /// peer side has gone away.
    async fn recv(&mut self) -> Result<PeerMessage>;
}

/// An in-memory link for tests and embedding.
///
/// Both directions carry encoded frames over unbounded channels, so the
/// codec is exercised exactly as on a byte transport.
pub mod memory {
    use super::*;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use crate::codec;
    use crate::error::SyncError;

    /// Create a connected host/peer pair.
    pub fn link() -> (MemoryOutbound, MemoryInbound, PeerLink) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        (
            MemoryOutbound { tx: request_tx },
            MemoryInbound { rx: message_rx },
            PeerLink {
                rx: request_rx,
                tx: message_tx,
            },
        )
    }

    /// Host side, outbound half.
    #[derive(Clone)]
    pub struct MemoryOutbound {
        tx: mpsc::UnboundedSender<Bytes>,
    }

    impl Outbound for MemoryOutbound {
        fn send(&self, request: PeerRequest) -> Result<()> {
            let frame = codec::encode_request(&request)?;
            self.tx.send(frame).map_err(|_| SyncError::Closed)
        }
    }

    /// Host side, inbound half.
    pub struct MemoryInbound {
        rx: mpsc::UnboundedReceiver<Bytes>,
    }

    #[async_trait]
    impl Inbound for MemoryInbound {
        async fn recv(&mut self) -> Result<PeerMessage> {
            match self.rx.recv().await {
                Some(frame) => codec::decode_message(&frame),
                None => Err(SyncError::Closed),
            }
        }
    }

    impl MemoryInbound {
        /// Receive without waiting. `Ok(None)` when nothing is queued.
        pub fn try_recv(&mut self) -> Result<Option<PeerMessage>> {
            match self.rx.try_recv() {
                Ok(frame) => codec::decode_message(&frame).map(Some),
                Err(mpsc::error::TryRecvError::Empty) => Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => Err(SyncError::Closed),
            }
        }
    }

    /// Peer side of a memory link.
    pub struct PeerLink {
        rx: mpsc::UnboundedReceiver<Bytes>,
        tx: mpsc::UnboundedSender<Bytes>,
    }

    impl PeerLink {
        /// Receive the next host request.
        pub async fn recv_request(&mut self) -> Result<PeerRequest> {
            match self.rx.recv().await {
                Some(frame) => codec::decode_request(&frame),
                None => Err(SyncError::Closed),
            }
        }

        /// Receive a host request without waiting.
        pub fn try_recv_request(&mut self) -> Result<Option<PeerRequest>> {
            match self.rx.try_recv() {
                Ok(frame) => codec::decode_request(&frame).map(Some),
                Err(mpsc::error::TryRecvError::Empty) => Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => Err(SyncError::Closed),
            }
        }

        /// Send a message to the host.
        pub fn send(&self, message: &PeerMessage) -> Result<()> {
            let frame = codec::encode_message(message)?;
            self.send_frame(frame)
        }

        /// Send a raw frame to the host.
        pub fn send_frame(&self, frame: Bytes) -> Result<()> {
            self.tx.send(frame).map_err(|_| SyncError::Closed)
        }
    }
}
