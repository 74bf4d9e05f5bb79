//! Room actor: a Tokio task that owns one [`RoomReconciler`].
//!
//! The actor folds channel events in arrival order, handles local bid
//! commands sent through an mpsc channel, and expires the pending bid
//! when its deadline passes. Every state change is published as a fresh
//! [`RoomSnapshot`] on a `watch` channel.

use std::future::Future;

use gavel_channel::{ChannelEvent, Subscription};
use gavel_protocol::{RoomId, UserId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{PendingBid, RoomError, RoomReconciler, RoomSnapshot};

/// Where the actor reads events from.
///
/// Implemented for a channel [`Subscription`] and for a plain unbounded
/// receiver, which tests use to feed events by hand.
pub trait EventSource: Send + 'static {
    /// The next event, or `None` once the source is finished.
    fn next_event(&mut self) -> impl Future<Output = Option<ChannelEvent>> + Send;
}

impl EventSource for Subscription {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.recv().await
    }
}

impl EventSource for mpsc::UnboundedReceiver<ChannelEvent> {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.recv().await
    }
}

/// Commands sent to the actor. Each carries a reply channel.
enum RoomCommand {
    Submit {
        user_id: UserId,
        amount: u64,
        reply: oneshot::Sender<Result<PendingBid, RoomError>>,
    },
    /// Drop the pending marker if it is still the bid of `amount`.
    Abandon {
        amount: u64,
        reply: oneshot::Sender<Option<PendingBid>>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Snapshots are read from the `watch` channel without
/// a round trip to the actor.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    snapshots: watch::Receiver<RoomSnapshot>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// The latest published state.
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshots.clone()
    }

    /// Validates a bid locally and marks it pending.
    pub async fn submit_bid(
        &self,
        user_id: UserId,
        amount: u64,
    ) -> Result<PendingBid, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Submit {
                user_id,
                amount,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Clears the pending marker for the bid of `amount`, if it is still
    /// pending.
    pub async fn abandon_bid(&self, amount: u64) -> Result<Option<PendingBid>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Abandon {
                amount,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Tells the actor to stop. Never waits.
    pub fn shutdown(&self) {
        let _ = self.sender.try_send(RoomCommand::Shutdown);
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_id", &self.room_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct RoomActor<E: EventSource> {
    reconciler: RoomReconciler,
    events: E,
    receiver: mpsc::Receiver<RoomCommand>,
    snapshots: watch::Sender<RoomSnapshot>,
}

impl<E: EventSource> RoomActor<E> {
    async fn run(mut self) {
        let room_id = self.reconciler.room_id();
        tracing::info!(%room_id, "room actor started");

        loop {
            let deadline = self.reconciler.pending_deadline().map(Instant::from_std);
            let expiry = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = self.events.next_event() => match event {
                    Some(ChannelEvent::Room(event)) => {
                        if self.reconciler.apply(&event) {
                            self.publish();
                        }
                    }
                    Some(ChannelEvent::Malformed { error, .. }) => {
                        tracing::debug!(%room_id, %error, "skipping malformed event");
                    }
                    None => {
                        tracing::debug!(%room_id, "event source finished");
                        break;
                    }
                },
                command = self.receiver.recv() => match command {
                    Some(RoomCommand::Submit { user_id, amount, reply }) => {
                        let now = Instant::now().into_std();
                        let result = self.reconciler.submit_bid(user_id, amount, now);
                        if result.is_ok() {
                            self.publish();
                        }
                        let _ = reply.send(result);
                    }
                    Some(RoomCommand::Abandon { amount, reply }) => {
                        let matches = self
                            .reconciler
                            .pending()
                            .is_some_and(|p| p.amount == amount);
                        let abandoned = if matches {
                            self.reconciler.abandon_pending()
                        } else {
                            None
                        };
                        if abandoned.is_some() {
                            self.publish();
                        }
                        let _ = reply.send(abandoned);
                    }
                    Some(RoomCommand::Shutdown) | None => break,
                },
                () = expiry => {
                    if self.reconciler.expire_pending(Instant::now().into_std()).is_some() {
                        self.publish();
                    }
                }
            }
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.reconciler.snapshot());
    }
}

/// Spawns the actor for `reconciler`, fed by `events`.
///
/// `channel_size` bounds the command queue.
pub fn spawn_room<E: EventSource>(
    reconciler: RoomReconciler,
    events: E,
    channel_size: usize,
) -> RoomHandle {
    let room_id = reconciler.room_id();
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let (snapshots, snapshot_rx) = watch::channel(reconciler.snapshot());

    let actor = RoomActor {
        reconciler,
        events,
        receiver: rx,
        snapshots,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        snapshots: snapshot_rx,
    }
}
