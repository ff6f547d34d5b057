//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The rest of the server only needs "something that turns a value into
//! bytes and back", so the format sits behind the [`Codec`] trait.
//! [`JsonCodec`] is what the browser client speaks.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec value is held by every
/// player task for its whole lifetime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use apollo_protocol::{Codec, GameUpdate, JsonCodec, MessageIn};
///
/// let codec = JsonCodec;
///
/// let msg: MessageIn = codec
///     .decode(br#"{"ReqId":"1","Act":{"G":{"C":0,"E":4}}}"#)
///     .unwrap();
/// assert_eq!(msg.req_id, "1");
///
/// let bytes = codec.encode(&GameUpdate::new()).unwrap();
/// assert_eq!(bytes, br#"{"GU":true,"Ps":[],"Es":[]}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::MessageIn;

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = JsonCodec.decode::<MessageIn>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_decode_empty_object() {
        let msg: MessageIn = JsonCodec.decode(b"{}").unwrap();
        assert_eq!(msg, MessageIn::default());
    }
}
