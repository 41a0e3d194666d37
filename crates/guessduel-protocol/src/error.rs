//! Error types for the protocol layer.
//!
//! Each guessduel crate owns its error enum, so a `ProtocolError` always
//! means "the bytes and the types disagree", never a networking or game
//! rule problem.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (Rust value → bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (bytes → Rust value).
    ///
    /// Malformed JSON, an unknown `event` tag, or a missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Parsed fine but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
