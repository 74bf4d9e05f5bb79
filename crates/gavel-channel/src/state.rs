//! Observable connection state.

use std::fmt;

/// Where the channel's connection currently stands.
///
/// ```text
/// Disconnected ──open──→ Connecting ──ok──→ Open
///                            │  ↑            │
///                       fail │  │ delay      │ failure / server close
///                            ↓  │            ↓
///                            Backoff ←───────┘
///
/// any ──close()──→ Disconnected (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Disconnected,
    Connecting,
    Open,
    Backoff,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Backoff => "backoff",
        })
    }
}

/// A snapshot of the channel's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub phase: Phase,
    /// Consecutive failures since the last successful open.
    pub attempt: u32,
    /// Why the last connection attempt or connection ended.
    pub last_error: Option<String>,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self {
            phase: Phase::Disconnected,
            attempt: 0,
            last_error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::disconnected()
    }
}
