//! Server-push events.
//!
//! Every frame on the push stream is one JSON object tagged by an `event`
//! field:
//!
//! ```json
//! {"event": "bid_accepted", "room_id": 3, "user_id": 9, "amount": 110, "timestamp": 1700000000000}
//! ```
//!
//! Unknown tags fail to decode; the event channel turns that into a
//! `Malformed` delivery rather than dropping the connection.

use serde::{Deserialize, Serialize};

use crate::types::{Lot, LotId, Participant, RoomId, RoomStatus, UserId};

/// One message from the server's push stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    /// The room moved to a new lifecycle status.
    RoomStatusChanged {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "status")]
        to: RoomStatus,
    },

    /// A lot opened for bidding.
    LotActivated {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        lot: Lot,
    },

    /// A lot was added to the room's queue.
    LotEnqueued {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        lot: Lot,
    },

    /// The server accepted a bid; it is now the leading bid.
    BidAccepted {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "userId")]
        user_id: UserId,
        amount: u64,
        timestamp: u64,
    },

    /// The server refused a bid.
    BidRejected {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "userId")]
        user_id: UserId,
        amount: u64,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Someone entered the room (or reconnected).
    ParticipantJoined {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        participant: Participant,
    },

    /// Someone left the room.
    ParticipantLeft {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "userId")]
        user_id: UserId,
    },

    /// Countdown for the active lot.
    TimerTick {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "secondsRemaining")]
        seconds_remaining: u64,
    },

    /// Bidding on a lot closed. `winner_user_id` is absent when nobody bid.
    #[serde(alias = "item_end")]
    LotEnded {
        #[serde(alias = "roomId")]
        room_id: RoomId,
        #[serde(alias = "lotId", alias = "productId", alias = "product_id")]
        lot_id: LotId,
        #[serde(alias = "winningPrice")]
        winning_price: u64,
        #[serde(default, alias = "winnerUserId")]
        winner_user_id: Option<UserId>,
    },

    /// A room was created. Broadcast on the global stream.
    RoomCreated { id: RoomId },

    /// A host started a room.
    RoomStarted { id: RoomId },
}

impl RoomEvent {
    /// The room this event concerns.
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::RoomStatusChanged { room_id, .. }
            | Self::LotActivated { room_id, .. }
            | Self::LotEnqueued { room_id, .. }
            | Self::BidAccepted { room_id, .. }
            | Self::BidRejected { room_id, .. }
            | Self::ParticipantJoined { room_id, .. }
            | Self::ParticipantLeft { room_id, .. }
            | Self::TimerTick { room_id, .. }
            | Self::LotEnded { room_id, .. } => *room_id,
            Self::RoomCreated { id } | Self::RoomStarted { id } => *id,
        }
    }

    /// The `event` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomStatusChanged { .. } => "room_status_changed",
            Self::LotActivated { .. } => "lot_activated",
            Self::LotEnqueued { .. } => "lot_enqueued",
            Self::BidAccepted { .. } => "bid_accepted",
            Self::BidRejected { .. } => "bid_rejected",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::TimerTick { .. } => "timer_tick",
            Self::LotEnded { .. } => "lot_ended",
            Self::RoomCreated { .. } => "room_created",
            Self::RoomStarted { .. } => "room_started",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> RoomEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decode_room_status_changed() {
        let event = decode(
            r#"{"event":"room_status_changed","room_id":4,"to":"running"}"#,
        );
        assert_eq!(
            event,
            RoomEvent::RoomStatusChanged {
                room_id: RoomId(4),
                to: RoomStatus::Running,
            }
        );
    }

    #[test]
    fn test_decode_lot_activated_with_camel_case_lot() {
        let event = decode(
            r#"{
                "event": "lot_activated",
                "roomId": "2",
                "lot": {"id": 8, "name": "Lamp", "startPrice": 50, "minStep": 5}
            }"#,
        );
        match event {
            RoomEvent::LotActivated { room_id, lot } => {
                assert_eq!(room_id, RoomId(2));
                assert_eq!(lot.id, LotId(8));
                assert_eq!(lot.start_price, 50);
                assert_eq!(lot.min_step, 5);
            }
            other => panic!("expected LotActivated, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_bid_rejected_reason_is_optional() {
        let without = decode(
            r#"{"event":"bid_rejected","room_id":1,"user_id":2,"amount":5,"timestamp":10}"#,
        );
        assert!(matches!(
            without,
            RoomEvent::BidRejected { reason: None, .. }
        ));

        let with = decode(
            r#"{"event":"bid_rejected","room_id":1,"user_id":2,"amount":5,"timestamp":10,"reason":"too low"}"#,
        );
        match with {
            RoomEvent::BidRejected { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("too low"));
            }
            other => panic!("expected BidRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_backend_room_broadcasts() {
        let created = decode(r#"{"event":"room_created","id":11}"#);
        let started = decode(r#"{"event":"room_started","id":"11"}"#);
        assert_eq!(created, RoomEvent::RoomCreated { id: RoomId(11) });
        assert_eq!(started, RoomEvent::RoomStarted { id: RoomId(11) });
        assert_eq!(started.room_id(), RoomId(11));
    }

    #[test]
    fn test_decode_timer_tick_camel_case() {
        let event = decode(r#"{"event":"timer_tick","roomId":3,"secondsRemaining":42}"#);
        assert_eq!(
            event,
            RoomEvent::TimerTick {
                room_id: RoomId(3),
                seconds_remaining: 42,
            }
        );
        assert_eq!(event.kind(), "timer_tick");
    }

    #[test]
    fn test_decode_lot_ended_with_and_without_winner() {
        let sold = decode(
            r#"{"event":"lot_ended","roomId":3,"productId":8,"winningPrice":150,"winnerUserId":9}"#,
        );
        assert_eq!(
            sold,
            RoomEvent::LotEnded {
                room_id: RoomId(3),
                lot_id: LotId(8),
                winning_price: 150,
                winner_user_id: Some(UserId(9)),
            }
        );

        let unsold = decode(
            r#"{"event":"item_end","room_id":3,"lot_id":8,"winning_price":100}"#,
        );
        assert!(matches!(
            unsold,
            RoomEvent::LotEnded { winner_user_id: None, .. }
        ));
        assert_eq!(unsold.room_id(), RoomId(3));
    }

    #[test]
    fn test_decode_unknown_tag_fails() {
        let result =
            serde_json::from_str::<RoomEvent>(r#"{"event":"confetti","id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_room_id_and_kind_cover_participant_events() {
        let joined = RoomEvent::ParticipantJoined {
            room_id: RoomId(6),
            participant: Participant::new(UserId(1), "ann"),
        };
        assert_eq!(joined.room_id(), RoomId(6));
        assert_eq!(joined.kind(), "participant_joined");

        let json = serde_json::to_value(&joined).unwrap();
        assert_eq!(json["event"], "participant_joined");
        assert_eq!(json["participant"]["user_id"], 1);
    }
}
