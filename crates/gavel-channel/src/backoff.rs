//! Reconnect delays: exponential, jittered, capped.
//!
//! ```text
//! delay(n) = min(max_delay, base · 2^(n-1) + jitter)
//! jitter   ∈ [0, jitter_ratio · base · 2^(n-1)]
//! ```
//!
//! With `jitter_ratio ≤ 1` the worst case for attempt `n` never exceeds
//! the best case for attempt `n + 1`, so the sequence is non-decreasing
//! until it reaches the cap.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Backoff tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry. Default: 500 ms.
    pub base: Duration,
    /// Upper bound for any delay. Default: 30 s.
    pub max_delay: Duration,
    /// Jitter as a fraction of the exponential term (0.0–1.0).
    /// Default: 0.2.
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_ratio: 0.2,
        }
    }
}

impl BackoffConfig {
    /// Smallest accepted `base`.
    pub const MIN_BASE: Duration = Duration::from_millis(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `base` raised to [`Self::MIN_BASE`].
    /// - `max_delay` raised to `base`.
    /// - `jitter_ratio` clamped to `0.0..=1.0` (NaN becomes 0).
    pub fn validated(mut self) -> Self {
        if self.base < Self::MIN_BASE {
            self.base = Self::MIN_BASE;
        }
        if self.max_delay < self.base {
            warn!(
                base_ms = self.base.as_millis() as u64,
                max_ms = self.max_delay.as_millis() as u64,
                "max_delay below base, raising to base"
            );
            self.max_delay = self.base;
        }
        self.jitter_ratio = if self.jitter_ratio.is_nan() {
            0.0
        } else {
            self.jitter_ratio.clamp(0.0, 1.0)
        };
        self
    }

    /// The delay for failure number `attempt` (1-based), given a jitter
    /// sample in `[0, 1]`.
    pub fn delay_for(&self, attempt: u32, jitter_sample: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let exp = self
            .base
            .as_nanos()
            .checked_mul(1u128 << exponent)
            .unwrap_or(u128::MAX);
        let jitter =
            (exp as f64 * self.jitter_ratio * jitter_sample.clamp(0.0, 1.0)) as u128;
        let capped = exp.saturating_add(jitter).min(self.max_delay.as_nanos());
        Duration::from_nanos(u64::try_from(capped).unwrap_or(u64::MAX))
    }
}

/// Counts consecutive failures and hands out delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config: config.validated(),
            attempt: 0,
        }
    }

    /// Consecutive failures since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Records a failure and returns how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let sample = if self.config.jitter_ratio > 0.0 {
            rand::rng().random::<f64>()
        } else {
            0.0
        };
        self.config.delay_for(self.attempt, sample)
    }

    /// Call on a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
