//! A live, joined room.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use gavel_channel::{ConnectionState, EventChannel, LogEntry};
use gavel_protocol::{RoomId, UserId};
use gavel_resource::{BidReceipt, ResourceError, Room, RoomApi};
use gavel_room::{RoomHandle, RoomSnapshot};
use tokio::sync::watch;

use crate::GavelError;
use crate::client::SessionManager;

/// One joined room: its push channel, its reconciler actor and the REST
/// calls that act on it.
///
/// The view is the only consumer of its channel. Closing (or dropping)
/// the view closes both.
pub struct RoomView {
    room: Room,
    channel: EventChannel,
    handle: RoomHandle,
    rooms: RoomApi,
    session: Arc<SessionManager>,
    generation: u64,
    current: Arc<AtomicU64>,
    closed: AtomicBool,
}

impl RoomView {
    pub(crate) fn new(
        room: Room,
        channel: EventChannel,
        handle: RoomHandle,
        rooms: RoomApi,
        session: Arc<SessionManager>,
        generation: u64,
        current: Arc<AtomicU64>,
    ) -> Self {
        Self {
            room,
            channel,
            handle,
            rooms,
            session,
            generation,
            current,
            closed: AtomicBool::new(false),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room.id
    }

    /// The room as fetched when the view was opened.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// The latest reconciled state.
    pub fn snapshot(&self) -> RoomSnapshot {
        self.handle.snapshot()
    }

    /// A receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<RoomSnapshot> {
        self.handle.watch()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.channel.watch_state()
    }

    /// Recent push events, oldest first.
    pub fn event_log(&self) -> Vec<LogEntry> {
        self.channel.event_log()
    }

    /// `false` once the view was closed or a newer view was opened.
    pub fn is_current(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.current.load(Ordering::SeqCst) == self.generation
    }

    /// Places a bid.
    ///
    /// The bid is checked against the reconciled state and marked pending
    /// before anything is sent. A successful reply does not move the
    /// price; the matching push event does. If the request fails the
    /// pending marker is cleared.
    ///
    /// # Errors
    /// - `NotAuthenticated` when signed out or the user id can't be
    ///   confirmed.
    /// - `Room` for local refusals (too low, no lot, already pending).
    /// - `Resource` for server refusals and transport failures.
    /// - `StaleView` if the view was closed or replaced while the request
    ///   was in flight.
    pub async fn submit_bid(&self, amount: u64) -> Result<BidReceipt, GavelError> {
        self.ensure_current()?;
        let user_id = self.bidder().await?;
        self.ensure_current()?;

        self.handle.submit_bid(user_id, amount).await?;
        let result = self.rooms.place_bid(self.room.id, amount).await;

        if !self.is_current() {
            tracing::debug!(room_id = %self.room.id, amount, "dropping bid result for stale view");
            return Err(GavelError::StaleView);
        }

        let failure = match result {
            Ok(receipt) if receipt.success => return Ok(receipt),
            Ok(receipt) => ResourceError::ValidationFailed(receipt.message),
            Err(e) => e,
        };
        tracing::info!(room_id = %self.room.id, amount, error = %failure, "bid request failed");
        // The actor may already be gone if the channel closed underneath us.
        let _ = self.handle.abandon_bid(amount).await;
        Err(failure.into())
    }

    /// Stops the view: unsubscribes, closes the channel and the actor.
    /// Calling it again does nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.handle.shutdown();
        self.channel.close();
        tracing::info!(room_id = %self.room.id, "left room");
    }

    fn ensure_current(&self) -> Result<(), GavelError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(GavelError::StaleView)
        }
    }

    /// The signed-in user's id, confirming a rehydrated session first.
    async fn bidder(&self) -> Result<UserId, GavelError> {
        let session = self.session.current_session();
        if !session.is_authenticated() {
            return Err(GavelError::NotAuthenticated);
        }
        if let Some(user_id) = session.user_id() {
            return Ok(user_id);
        }
        self.session
            .confirm()
            .await?
            .user_id()
            .ok_or(GavelError::NotAuthenticated)
    }
}

impl Drop for RoomView {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RoomView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomView")
            .field("room_id", &self.room.id)
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish()
    }
}
