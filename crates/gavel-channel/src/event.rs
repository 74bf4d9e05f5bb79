use gavel_protocol::RoomEvent;

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A frame that decoded into a known event.
    Room(RoomEvent),
    /// A frame that did not decode. The connection stays up.
    Malformed {
        /// The frame as text (invalid UTF-8 replaced).
        raw: String,
        error: String,
    },
}

impl ChannelEvent {
    pub fn as_room_event(&self) -> Option<&RoomEvent> {
        match self {
            Self::Room(event) => Some(event),
            Self::Malformed { .. } => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

impl From<RoomEvent> for ChannelEvent {
    fn from(event: RoomEvent) -> Self {
        Self::Room(event)
    }
}
