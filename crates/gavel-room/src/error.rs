//! Error types for the room layer.

use gavel_protocol::RoomId;

/// Why a local room operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The bid fails a local check (too low, room not running). Nothing
    /// was sent to the server.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// No lot is open for bidding.
    #[error("no active lot")]
    NoActiveLot,

    /// An earlier bid from this view is still waiting for confirmation.
    #[error("a bid of {0} is still pending")]
    BidPending(u64),

    /// The room's actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
