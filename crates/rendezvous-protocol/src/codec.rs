//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The rest of the workspace never calls `serde_json` directly for wire
//! traffic; it goes through a [`Codec`] so the format can be swapped.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use rendezvous_protocol::{Codec, Envelope, JsonCodec, Payload, Request};
///
/// let codec = JsonCodec;
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 0,
///     payload: Payload::Request(Request::ListRooms),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, Request};

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_request_type() {
        let raw = br#"{"seq":1,"timestamp":0,"payload":{"type":"Request","data":{"type":"Teleport"}}}"#;
        let result: Result<Envelope, _> = JsonCodec.decode(raw);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_accepts_text_written_by_hand() {
        let raw = br#"{"seq":3,"timestamp":0,"payload":{"type":"Request","data":{"type":"GetRoom","room_code":"ABCD"}}}"#;
        let env: Envelope = JsonCodec.decode(raw).unwrap();
        assert_eq!(env.seq, 3);
        assert_eq!(
            env.payload,
            Payload::Request(Request::GetRoom {
                room_code: "ABCD".into()
            })
        );
    }
}
