//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A status string that isn't one of `waiting`, `in_progress`,
    /// `completed`.
    #[error("unknown room status: {0:?}")]
    UnknownStatus(String),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// request with an empty room code.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
