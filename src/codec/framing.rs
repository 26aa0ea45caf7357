//! Length-delimited framing over the wire message schema.
//!
//! Frames are CBOR-encoded [`WireMessage`] values, length-prefixed by
//! [`tokio_util::codec::LengthDelimitedCodec`] at the transport layer; this
//! module owns only the payload encode/decode step.

use bytes::Bytes;

use super::message::WireMessage;
use crate::error::CodecError;

/// Encodes a [`WireMessage`] to its CBOR wire representation.
pub fn encode_message(message: &WireMessage) -> Result<Bytes, CodecError> {
    serde_cbor::to_vec(message)
        .map(Bytes::from)
        .map_err(|err| CodecError::InvalidMessage(err.to_string()))
}

/// Decodes a [`WireMessage`] from raw frame bytes.
pub fn decode_message(bytes: &[u8]) -> Result<WireMessage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Truncated);
    }
    serde_cbor::from_slice(bytes).map_err(|err| CodecError::InvalidMessage(err.to_string()))
}
