//! Reconciler configuration.

use std::time::Duration;

use tracing::warn;

/// How many bid events a room keeps by default.
pub const HISTORY_CAPACITY: usize = 50;

/// Settings for a [`RoomReconciler`](crate::RoomReconciler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Bid events kept in the history, most recent first, and closed-lot
    /// results kept alongside. Default: 50.
    pub history_capacity: usize,

    /// How long a local bid may wait for its confirming event before it
    /// is flagged as unconfirmed. Default: 10 s.
    pub pending_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            pending_timeout: Duration::from_secs(10),
        }
    }
}

impl ReconcilerConfig {
    /// Smallest accepted `pending_timeout`.
    pub const MIN_PENDING_TIMEOUT: Duration = Duration::from_millis(100);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `history_capacity` raised to 1.
    /// - `pending_timeout` raised to [`Self::MIN_PENDING_TIMEOUT`].
    pub fn validated(mut self) -> Self {
        if self.history_capacity == 0 {
            warn!("history_capacity of 0 is invalid, using 1");
            self.history_capacity = 1;
        }
        if self.pending_timeout < Self::MIN_PENDING_TIMEOUT {
            warn!(
                requested_ms = self.pending_timeout.as_millis() as u64,
                "pending_timeout too short, clamping"
            );
            self.pending_timeout = Self::MIN_PENDING_TIMEOUT;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconciler_config_default() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.pending_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validated_clamps_zero_values() {
        let config = ReconcilerConfig {
            history_capacity: 0,
            pending_timeout: Duration::ZERO,
        }
        .validated();
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.pending_timeout, ReconcilerConfig::MIN_PENDING_TIMEOUT);
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.clone().validated(), config);
    }
}
