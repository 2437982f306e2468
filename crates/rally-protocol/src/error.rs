//! Error types for the protocol layer.
//!
//! Each crate in Rally defines its own error enum. A `ProtocolError` means
//! the bytes on the wire were wrong: bad JSON, a broken record boundary, or
//! a stream that ended halfway through a message.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, or a missing
    /// required field. Fatal for the connection that sent it.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The stream ended with bytes buffered but no closing delimiter.
    ///
    /// A peer that dies mid-send leaves exactly this behind. The partial
    /// record is never handed to the decoder.
    #[error("stream ended mid-message ({pending} bytes without delimiter)")]
    Truncated { pending: usize },

    /// A record grew past the frame limit without a delimiter.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLong { len: usize, max: usize },
}

impl ProtocolError {
    /// Returns `true` for errors in the record boundaries themselves, as
    /// opposed to the content of a well-delimited record.
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::FrameTooLong { .. })
    }
}
