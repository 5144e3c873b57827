//! CBOR framing for byte-oriented transports.
//!
//! A frame is one version byte followed by the CBOR encoding of a
//! [`PeerRequest`] or [`PeerMessage`].

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::messages::{PeerMessage, PeerRequest, PROTOCOL_VERSION};

/// Encode a host request into a frame.
pub fn encode_request(request: &PeerRequest) -> Result<Bytes> {
    encode(request)
}

/// Decode a frame into a host request.
pub fn decode_request(frame: &[u8]) -> Result<PeerRequest> {
    decode(frame)
}

/// Encode a peer message into a frame.
pub fn encode_message(message: &PeerMessage) -> Result<Bytes> {
    encode(message)
}

/// Decode a frame into a peer message.
pub fn decode_message(frame: &[u8]) -> Result<PeerMessage> {
    decode(frame)
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    let mut body = Vec::new();
    ciborium::into_writer(value, &mut body)
        .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;

    let mut frame = BytesMut::with_capacity(body.len() + 1);
    frame.put_u8(PROTOCOL_VERSION);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    let (&version, body) = frame
        .split_first()
        .ok_or_else(|| SyncError::InvalidMessage("empty frame".into()))?;

    if version != PROTOCOL_VERSION {
        return Err(SyncError::VersionMismatch {
            local: PROTOCOL_VERSION,
            peer: version,
        });
    }

    ciborium::from_reader(body).map_err(|e| SyncError::InvalidMessage(e.to_string()))
}
