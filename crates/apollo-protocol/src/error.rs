//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// integer code outside its enum.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but is not meaningful.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// An integer on the wire that maps to no variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code {code}")]
pub struct UnknownCode {
    /// Which enum was being decoded.
    pub kind: &'static str,
    /// The offending value.
    pub code: i32,
}
