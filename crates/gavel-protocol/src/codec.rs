//! Frame decoding.
//!
//! The client only ever reads from the push stream, so a codec here is one
//! direction: bytes in, typed value out. The event channel is generic over
//! [`Codec`]; the server speaks JSON, which [`JsonCodec`] handles.

use serde::de::DeserializeOwned;

use crate::ProtocolError;

/// Turns one inbound frame into a typed value.
///
/// Lives inside the channel's connection task, hence `Send + Sync + 'static`.
pub trait Codec: Send + Sync + 'static {
    /// Decodes a whole frame.
    ///
    /// # Errors
    /// `ProtocolError::Decode` when the frame is not valid for `T`.
    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError>;
}

/// Frames are JSON objects, one per message.
///
/// ```rust
/// use gavel_protocol::{Codec, JsonCodec, RoomEvent, RoomId};
///
/// let event: RoomEvent = JsonCodec
///     .decode(br#"{"event":"room_started","id":7}"#)
///     .unwrap();
/// assert_eq!(event.room_id(), RoomId(7));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(frame).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{RoomEvent, RoomId, UserId};

    #[test]
    fn test_decode_bid_accepted_frame() {
        let frame = br#"{
            "event": "bid_accepted",
            "room_id": 3,
            "user_id": 9,
            "amount": 110,
            "timestamp": 1700000000000
        }"#;
        let event: RoomEvent = JsonCodec.decode(frame).unwrap();
        assert_eq!(
            event,
            RoomEvent::BidAccepted {
                room_id: RoomId(3),
                user_id: UserId(9),
                amount: 110,
                timestamp: 1_700_000_000_000,
            }
        );
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<RoomEvent, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_frame_returns_decode_error() {
        let result: Result<RoomEvent, _> =
            JsonCodec.decode(br#"{"event":"room_started","id":"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
