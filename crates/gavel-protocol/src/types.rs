//! Core protocol types carried by push-stream events.
//!
//! Everything in here is "on the wire": the server serializes it, we decode
//! it. The backends this client talks to have not always agreed on field
//! names (`startPrice` vs `start_price`) or on whether ids are numbers or
//! strings, so this module is the one place where those variants are
//! normalized. Code above the protocol layer never re-guesses field names.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identifier decoding
// ---------------------------------------------------------------------------

/// Deserializes an identifier that may arrive as a JSON number or as a
/// numeric string (`7` and `"7"` are both accepted).
///
/// Exposed so collaborator DTOs in other crates can reuse the same rule via
/// `#[serde(deserialize_with = "gavel_protocol::deserialize_id")]`.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IdVisitor)
}

struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer id or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.trim()
            .parse::<u64>()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user account.
///
/// Newtype over `u64` so a `UserId` can never be passed where a `RoomId`
/// is expected. Serialized as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UserId(#[serde(deserialize_with = "deserialize_id")] pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for an auction room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(#[serde(deserialize_with = "deserialize_id")] pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A unique identifier for a lot (a product put up for bidding).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct LotId(#[serde(deserialize_with = "deserialize_id")] pub u64);

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of an auction room.
///
/// Status only ever moves forward:
///
/// ```text
/// Waiting → Pending → Running → Ended
/// ```
///
/// Skipping forward is allowed (`Waiting → Running` when a host starts the
/// room directly); moving backward never is. The backend also writes
/// `sold` and `cancelled` for rooms that are over; both decode as
/// [`RoomStatus::Ended`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Room exists; the auction has not been scheduled to start.
    #[serde(alias = "WAITING")]
    Waiting,
    /// Start has been requested or scheduled.
    #[serde(alias = "PENDING")]
    Pending,
    /// Bidding is open.
    #[serde(alias = "RUNNING")]
    Running,
    /// Auction is over, whether it sold or was cancelled.
    #[serde(
        alias = "ENDED",
        alias = "sold",
        alias = "SOLD",
        alias = "cancelled",
        alias = "CANCELLED",
        alias = "canceled"
    )]
    Ended,
}

impl RoomStatus {
    /// Position in the forward-only lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Pending => 1,
            Self::Running => 2,
            Self::Ended => 3,
        }
    }

    /// Returns `true` if moving from `self` to `target` goes forward.
    pub fn can_advance_to(self, target: Self) -> bool {
        target.rank() > self.rank()
    }

    /// Returns `true` while bids may be placed.
    pub fn accepts_bids(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lot
// ---------------------------------------------------------------------------

fn default_min_step() -> u64 {
    1
}

/// A raise of zero would let a bid tie the current price, so it reads as 1.
fn deserialize_min_step<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(|step| step.max(1))
}

/// An item open (or queued) for bidding.
///
/// Prices are integral amounts in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Lot identifier (the product id on the server side).
    pub id: LotId,
    /// Display name.
    pub name: String,
    /// Opening price.
    #[serde(alias = "startPrice", alias = "basePrice", alias = "base_price")]
    pub start_price: u64,
    /// Highest accepted bid so far. Missing on freshly queued lots.
    #[serde(default, alias = "currentPrice")]
    pub current_price: u64,
    /// Smallest allowed raise over `current_price`. Never below 1.
    #[serde(
        default = "default_min_step",
        deserialize_with = "deserialize_min_step",
        alias = "minStep",
        alias = "step"
    )]
    pub min_step: u64,
    /// Holder of the highest accepted bid.
    #[serde(default, alias = "leadingUserId")]
    pub leading_user_id: Option<UserId>,
}

impl Lot {
    /// Creates a lot with no bids yet (`current_price == start_price`).
    /// A `min_step` of 0 is raised to 1.
    pub fn new(
        id: LotId,
        name: impl Into<String>,
        start_price: u64,
        min_step: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start_price,
            current_price: start_price,
            min_step: min_step.max(1),
            leading_user_id: None,
        }
    }

    /// The smallest amount the next bid must reach.
    pub fn minimum_next_bid(&self) -> u64 {
        self.current_price.saturating_add(self.min_step.max(1))
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

fn default_online() -> bool {
    true
}

/// A user present (or recently present) in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The participant's account id.
    #[serde(alias = "userId", alias = "id")]
    pub user_id: UserId,
    /// Display name.
    #[serde(alias = "username")]
    pub name: String,
    /// Whether the participant currently holds a connection to the room.
    #[serde(default = "default_online")]
    pub online: bool,
    /// Whether the participant hosts the room.
    #[serde(default, alias = "isHost", alias = "host")]
    pub is_host: bool,
}

impl Participant {
    /// Creates an online, non-host participant.
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            online: true,
            is_host: false,
        }
    }

    /// Marks the participant as the room host.
    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

// ---------------------------------------------------------------------------
// BidOutcome
// ---------------------------------------------------------------------------

/// What the server decided about a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidOutcome {
    /// The bid became the new leading bid.
    Accepted,
    /// The bid was refused; kept for audit display only.
    Rejected,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Identifiers
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_room_id_deserializes_from_number_or_string() {
        let a: RoomId = serde_json::from_str("12").unwrap();
        let b: RoomId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(a, RoomId(12));
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_rejects_negative_and_non_numeric() {
        assert!(serde_json::from_str::<UserId>("-1").is_err());
        assert!(serde_json::from_str::<UserId>("\"room-abc\"").is_err());
        assert!(serde_json::from_str::<UserId>("true").is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId(7).to_string(), "U-7");
        assert_eq!(RoomId(3).to_string(), "R-3");
        assert_eq!(LotId(1).to_string(), "L-1");
    }

    // =====================================================================
    // RoomStatus
    // =====================================================================

    #[test]
    fn test_room_status_can_advance_only_forward() {
        assert!(RoomStatus::Waiting.can_advance_to(RoomStatus::Pending));
        assert!(RoomStatus::Waiting.can_advance_to(RoomStatus::Running));
        assert!(RoomStatus::Pending.can_advance_to(RoomStatus::Running));
        assert!(RoomStatus::Running.can_advance_to(RoomStatus::Ended));

        assert!(!RoomStatus::Running.can_advance_to(RoomStatus::Waiting));
        assert!(!RoomStatus::Ended.can_advance_to(RoomStatus::Running));
        assert!(!RoomStatus::Running.can_advance_to(RoomStatus::Running));
    }

    #[test]
    fn test_room_status_accepts_lower_and_upper_case() {
        let a: RoomStatus = serde_json::from_str("\"running\"").unwrap();
        let b: RoomStatus = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(a, RoomStatus::Running);
        assert_eq!(b, RoomStatus::Running);
        assert_eq!(
            serde_json::to_string(&RoomStatus::Ended).unwrap(),
            "\"ended\""
        );
    }

    #[test]
    fn test_room_status_sold_and_cancelled_decode_as_ended() {
        for raw in ["\"sold\"", "\"SOLD\"", "\"cancelled\"", "\"CANCELLED\""] {
            let status: RoomStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, RoomStatus::Ended, "{raw}");
        }
    }

    #[test]
    fn test_room_status_only_running_accepts_bids() {
        assert!(RoomStatus::Running.accepts_bids());
        assert!(!RoomStatus::Waiting.accepts_bids());
        assert!(!RoomStatus::Pending.accepts_bids());
        assert!(!RoomStatus::Ended.accepts_bids());
    }

    // =====================================================================
    // Lot / Participant decoding
    // =====================================================================

    #[test]
    fn test_lot_accepts_camel_case_and_defaults() {
        let json = r#"{"id": "5", "name": "Vintage Clock", "startPrice": 120}"#;
        let lot: Lot = serde_json::from_str(json).unwrap();
        assert_eq!(lot.id, LotId(5));
        assert_eq!(lot.start_price, 120);
        // Missing on the wire; the reconciler lifts it to start_price.
        assert_eq!(lot.current_price, 0);
        assert_eq!(lot.min_step, 1);
        assert!(lot.leading_user_id.is_none());
    }

    #[test]
    fn test_lot_zero_step_reads_as_one() {
        let json = r#"{"id": 2, "name": "Rug", "startPrice": 100, "minStep": 0}"#;
        let lot: Lot = serde_json::from_str(json).unwrap();
        assert_eq!(lot.min_step, 1);
        assert_eq!(Lot::new(LotId(2), "Rug", 100, 0).min_step, 1);

        let mut raw = Lot::new(LotId(2), "Rug", 100, 5);
        raw.min_step = 0;
        assert_eq!(raw.minimum_next_bid(), 101);
    }

    #[test]
    fn test_lot_minimum_next_bid() {
        let mut lot = Lot::new(LotId(1), "Chair", 100, 10);
        assert_eq!(lot.minimum_next_bid(), 110);
        lot.current_price = u64::MAX;
        assert_eq!(lot.minimum_next_bid(), u64::MAX);
    }

    #[test]
    fn test_participant_accepts_alias_fields() {
        let json = r#"{"id": 1, "username": "admin", "host": true}"#;
        let p: Participant = serde_json::from_str(json).unwrap();
        assert_eq!(p.user_id, UserId(1));
        assert_eq!(p.name, "admin");
        assert!(p.online);
        assert!(p.is_host);
    }
}
