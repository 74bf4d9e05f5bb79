//! Wire protocol for Gavel.
//!
//! This crate defines the "language" the auction server speaks on its push
//! stream:
//!
//! - **Identifiers** ([`UserId`], [`RoomId`], [`LotId`]): newtypes that
//!   accept both numbers and numeric strings on the wire.
//! - **Domain types** ([`Lot`], [`Participant`], [`RoomStatus`],
//!   [`BidOutcome`]): the shapes carried inside events.
//! - **Events** ([`RoomEvent`]): one variant per server-push message.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are decoded.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (RoomEvent) → Channel (fan-out) → Room (fold)
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::RoomEvent;
pub use types::{
    deserialize_id, BidOutcome, Lot, LotId, Participant, RoomId, RoomStatus,
    UserId,
};
