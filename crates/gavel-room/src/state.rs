//! Read-only views of a room's live state.

use std::time::Instant;

use gavel_protocol::{BidOutcome, Lot, LotId, Participant, RoomId, RoomStatus, UserId};

/// One entry in the bid history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidEvent {
    pub user_id: UserId,
    pub amount: u64,
    /// Server time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub outcome: BidOutcome,
}

/// A user's best accepted bid on the active lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankEntry {
    pub user_id: UserId,
    pub amount: u64,
    pub timestamp: u64,
}

/// How a closed lot ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotResult {
    pub lot_id: LotId,
    pub winning_price: u64,
    /// `None` when the lot closed without a bid.
    pub winner_user_id: Option<UserId>,
}

/// A bid submitted from this client that the server has not yet answered
/// on the push stream. Display only; it never moves the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBid {
    pub user_id: UserId,
    pub amount: u64,
    pub lot_id: LotId,
    pub submitted_at: Instant,
}

/// A point-in-time copy of a room, safe to hand to presentation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub active_lot: Option<Lot>,
    /// Lots waiting their turn, in order.
    pub queue: Vec<Lot>,
    /// Best bid per user on the active lot: highest amount first, earlier
    /// timestamp first on ties.
    pub ranking: Vec<RankEntry>,
    /// Most recent first.
    pub history: Vec<BidEvent>,
    /// Ordered by user id.
    pub participants: Vec<Participant>,
    pub pending: Option<PendingBid>,
    /// Amount of the last local bid that timed out without confirmation.
    pub unconfirmed: Option<u64>,
    /// Seconds left on the active lot, from the latest timer tick.
    pub seconds_remaining: Option<u64>,
    /// Closed lots, oldest first.
    pub results: Vec<LotResult>,
}

impl RoomSnapshot {
    /// The current price of the active lot.
    pub fn current_price(&self) -> Option<u64> {
        self.active_lot.as_ref().map(|lot| lot.current_price)
    }

    /// Who holds the leading bid on the active lot.
    pub fn leading_user_id(&self) -> Option<UserId> {
        self.active_lot.as_ref().and_then(|lot| lot.leading_user_id)
    }

    /// The participant flagged as host.
    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host)
    }

    /// The result of the most recently closed lot.
    pub fn last_result(&self) -> Option<&LotResult> {
        self.results.last()
    }

    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }
}
