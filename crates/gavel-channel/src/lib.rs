//! Reconnecting push-stream channel for Gavel.
//!
//! An [`EventChannel`] keeps one logical subscription to the server's
//! push stream alive across connection failures and fans decoded events
//! out to any number of [`Subscription`]s.
//!
//! ```text
//! Disconnected → Connecting → Open → (failure) → Backoff → Connecting …
//! ```
//!
//! Transport failures never surface as errors. They move the channel into
//! [`Phase::Backoff`] and are visible only through [`ConnectionState`].
//! Frames that don't decode are delivered as [`ChannelEvent::Malformed`].

mod backoff;
mod channel;
mod event;
mod hub;
mod log;
mod state;

pub use backoff::{Backoff, BackoffConfig};
pub use channel::{ChannelConfig, EventChannel};
pub use event::ChannelEvent;
pub use hub::{Subscription, SubscriptionId};
pub use log::{EVENT_LOG_CAPACITY, EventLog, LogEntry};
pub use state::{ConnectionState, Phase};
