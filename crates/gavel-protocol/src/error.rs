//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means "these bytes are not an event we
//! understand", never a network problem.

/// Why a frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Malformed JSON, missing required fields, wrong data types, or an
    /// unknown `event` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
