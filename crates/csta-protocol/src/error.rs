//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Codec failures carry the formatter's message as text so callers handle a
/// single error type whatever XML backend produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into XML).
    #[error("encode failed: {0}")]
    Encode(String),

    /// Deserialization failed: malformed XML, missing required elements,
    /// or text that does not parse into the field's type.
    #[error("decode failed: {0}")]
    Decode(String),

    /// No adapter exists for the requested protocol version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
}
