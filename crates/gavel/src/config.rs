//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use gavel_channel::ChannelConfig;
use gavel_resource::DEFAULT_TIMEOUT;
use gavel_room::ReconcilerConfig;
use gavel_session::SessionConfig;
use tracing::warn;

use crate::GavelError;

/// Everything a [`GavelClient`](crate::GavelClient) needs to know.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API root. Default: `http://localhost:8080`.
    pub base_url: String,

    /// Push stream endpoint. Room streams append `?room=<id>`.
    /// Default: `ws://localhost:8081/ws`.
    pub stream_url: String,

    /// Where the session token is persisted. `None` keeps it in memory
    /// for the life of the process.
    pub credentials_dir: Option<PathBuf>,

    /// Per-request timeout for REST calls. Default: 10 s.
    pub request_timeout: Duration,

    /// Capacity of each room actor's command queue. Default: 32.
    pub command_buffer: usize,

    pub session: SessionConfig,
    pub channel: ChannelConfig,
    pub reconciler: ReconcilerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            stream_url: "ws://localhost:8081/ws".to_string(),
            credentials_dir: None,
            request_timeout: DEFAULT_TIMEOUT,
            command_buffer: 32,
            session: SessionConfig::default(),
            channel: ChannelConfig::default(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Smallest accepted `request_timeout`.
    pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

    /// Clamp out-of-range values and reject unusable URLs.
    ///
    /// # Errors
    /// `InvalidConfig` if either URL is empty or has the wrong scheme.
    pub fn validated(mut self) -> Result<Self, GavelError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GavelError::InvalidConfig(format!(
                "base_url must be http(s): {:?}",
                self.base_url
            )));
        }
        if !(self.stream_url.starts_with("ws://") || self.stream_url.starts_with("wss://")) {
            return Err(GavelError::InvalidConfig(format!(
                "stream_url must be ws(s): {:?}",
                self.stream_url
            )));
        }
        if self.request_timeout < Self::MIN_REQUEST_TIMEOUT {
            warn!(
                requested_ms = self.request_timeout.as_millis() as u64,
                "request_timeout too short, clamping"
            );
            self.request_timeout = Self::MIN_REQUEST_TIMEOUT;
        }
        if self.command_buffer == 0 {
            self.command_buffer = 1;
        }
        self.session = self.session.validated();
        self.channel = self.channel.validated();
        self.reconciler = self.reconciler.validated();
        Ok(self)
    }

    /// The stream URL for one room.
    pub fn room_stream_url(&self, room_id: gavel_protocol::RoomId) -> String {
        let separator = if self.stream_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}room={}", self.stream_url, room_id.0)
    }
}
