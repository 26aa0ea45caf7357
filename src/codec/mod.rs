//! Message Codec: the wire message schema, CBOR payload encoding, and the
//! channel-id-prefixed frame format spoken by [`crate::channel::NetworkChannel`].

pub mod framing;
pub mod message;

pub use framing::{decode_message, encode_message};
pub use message::*;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Encodes `message` as a channel frame: a one-byte channel id followed by
/// the CBOR-encoded payload. The length prefix itself is added by the
/// transport's `LengthDelimitedCodec`, not here.
pub fn encode_frame(channel_id: u8, message: &WireMessage) -> Result<Bytes, CodecError> {
    let payload = encode_message(message)?;
    let mut frame = BytesMut::with_capacity(1 + payload.len());
    frame.put_u8(channel_id);
    frame.extend_from_slice(&payload);
    Ok(frame.freeze())
}

/// Decodes a channel frame produced by [`encode_frame`] into its channel id
/// and payload message.
pub fn decode_frame(frame: Bytes) -> Result<(u8, WireMessage), CodecError> {
    let (channel_id, payload) = split_frame(frame)?;
    let message = decode_message(&payload)?;
    Ok((channel_id, message))
}

/// Strips the leading channel-id byte from a frame without touching the CBOR
/// payload, for use by [`crate::channel::NetworkChannel`] implementations
/// that forward raw payload bytes up to the codec layer.
pub fn split_frame(mut frame: Bytes) -> Result<(u8, Bytes), CodecError> {
    if frame.is_empty() {
        return Err(CodecError::Truncated);
    }
    let channel_id = frame.get_u8();
    Ok((channel_id, frame))
}

/// Encodes a UTF-8 string as UTF-16LE bytes, the form the wire protocol
/// expects for usernames and display names.
pub fn encode_utf16(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Decodes UTF-16LE bytes back into a `String`, replacing any ill-formed
/// sequences with the Unicode replacement character.
pub fn decode_utf16(bytes: &[u8]) -> Result<String, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::InvalidMessage(
            "utf-16 byte stream has odd length".into(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|err| CodecError::InvalidMessage(format!("invalid utf-16: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Version;

    #[test]
    fn frame_round_trips_channel_id_and_payload() {
        let message = WireMessage::ServerHello(ServerHello {
            method: AuthMethod::Srp,
            server_version: Version::new(2, 6, 0),
            nonce_s: vec![9, 9, 9],
        });
        let frame = encode_frame(7, &message).unwrap();
        let (channel_id, decoded) = decode_frame(frame).unwrap();
        assert_eq!(channel_id, 7);
        match decoded {
            WireMessage::ServerHello(hello) => assert_eq!(hello.nonce_s, vec![9, 9, 9]),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn utf16_round_trips_non_ascii() {
        let original = "alice-\u{00e9}\u{4e2d}";
        let encoded = encode_utf16(original);
        let decoded = decode_utf16(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn utf16_rejects_odd_length() {
        let err = decode_utf16(&[0x00]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMessage(_)));
    }
}
