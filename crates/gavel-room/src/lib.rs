//! Room live-state reconciliation for Gavel.
//!
//! A [`RoomReconciler`] is the single authoritative projection of one
//! auction room. It folds server-confirmed events from the push stream
//! together with local bid intents, and never lets a local intent move the
//! price: only a `BidAccepted` event does that.
//!
//! # Key types
//!
//! - [`RoomReconciler`]: the synchronous fold
//! - [`RoomHandle`]: talk to a reconciler running as an actor task
//! - [`RoomSnapshot`]: a read-only copy for presentation
//! - [`ReconcilerConfig`]: history size and pending-bid timeout

mod config;
mod error;
mod reconciler;
mod room;
mod state;

pub use config::{HISTORY_CAPACITY, ReconcilerConfig};
pub use error::RoomError;
pub use reconciler::RoomReconciler;
pub use room::{EventSource, RoomHandle, spawn_room};
pub use state::{BidEvent, LotResult, PendingBid, RankEntry, RoomSnapshot};
