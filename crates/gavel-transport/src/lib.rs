//! Transport abstraction layer for Gavel.
//!
//! Provides the [`Connector`] and [`FrameStream`] traits that abstract over
//! how the client reaches the server's push stream. The event channel only
//! sees raw frames; it never knows whether they came over a WebSocket or a
//! scripted in-memory stream in a test.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket connector via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketFrames};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where to connect, and which credential to present.
///
/// The bearer token is attached to the upgrade request as an
/// `Authorization: Bearer <token>` header.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// Full stream URL, e.g. `ws://localhost:8081/ws?room=7`.
    pub url: String,
    /// Session token, if the client is signed in.
    pub bearer: Option<String>,
}

impl StreamTarget {
    /// Creates an anonymous target for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer: None,
        }
    }

    /// Sets (or clears) the bearer token.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTarget")
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Opens connections to a push stream.
///
/// The returned futures are `Send` so the event channel can drive them
/// from a spawned Tokio task.
pub trait Connector: Send + Sync + 'static {
    /// The stream type produced by this connector.
    type Stream: FrameStream;

    /// Opens a new connection and completes its handshake.
    fn connect(
        &self,
        target: &StreamTarget,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// One open connection delivering inbound frames.
pub trait FrameStream: Send + 'static {
    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    fn next_frame(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_stream_target_with_bearer_sets_token() {
        let target = StreamTarget::new("ws://localhost/ws")
            .with_bearer(Some("abc".into()));
        assert_eq!(target.bearer.as_deref(), Some("abc"));

        let target = target.with_bearer(None);
        assert!(target.bearer.is_none());
    }

    #[test]
    fn test_stream_target_debug_redacts_token() {
        let target = StreamTarget::new("ws://localhost/ws")
            .with_bearer(Some("super-secret".into()));
        let printed = format!("{target:?}");
        assert!(printed.contains("ws://localhost/ws"));
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
