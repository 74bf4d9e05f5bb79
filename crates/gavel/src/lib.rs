//! # Gavel
//!
//! Client core for live auctions.
//!
//! Gavel keeps the authenticated session, talks to the REST API, holds a
//! reconnecting push-stream subscription and folds its events into one
//! authoritative state per room. Presentation code only ever reads
//! snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gavel::prelude::*;
//!
//! # async fn run() -> Result<(), GavelError> {
//! let client = GavelClient::builder()
//!     .base_url("http://localhost:8080")
//!     .stream_url("ws://localhost:8081/ws")
//!     .build()
//!     .await?;
//! client.login("alice", "secret").await?;
//!
//! let view = client.join_room(RoomId(7)).await?;
//! let mut changes = view.watch();
//! while changes.changed().await.is_ok() {
//!     let snapshot = changes.borrow().clone();
//!     println!("{:?} leads at {:?}", snapshot.leading_user_id(), snapshot.current_price());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod view;

pub use client::{GavelClient, GavelClientBuilder, SessionManager};
pub use config::ClientConfig;
pub use error::GavelError;
pub use view::RoomView;

pub use gavel_channel as channel;
pub use gavel_protocol as protocol;
pub use gavel_resource as resource;
pub use gavel_room as room;
pub use gavel_session as session;
pub use gavel_transport as transport;

pub mod prelude {
    pub use crate::{ClientConfig, GavelClient, GavelClientBuilder, GavelError, RoomView};
    pub use gavel_channel::{
        ChannelConfig, ChannelEvent, ConnectionState, EventChannel, Phase, Subscription,
    };
    pub use gavel_protocol::{
        BidOutcome, Lot, LotId, Participant, RoomEvent, RoomId, RoomStatus, UserId,
    };
    pub use gavel_resource::{
        BidReceipt, Product, ProductApi, ProductDraft, ResourceError, Room, RoomApi, RoomDraft,
    };
    pub use gavel_room::{
        BidEvent, LotResult, PendingBid, RankEntry, ReconcilerConfig, RoomError, RoomSnapshot,
    };
    pub use gavel_session::{Identity, Session, SessionConfig, SessionError};
}
