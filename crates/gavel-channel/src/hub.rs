//! Subscriber fan-out.
//!
//! The hub is a small registry of unbounded senders guarded by a
//! `parking_lot::Mutex`. The lock is only held to clone the sender list
//! or to insert/remove one entry, never across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ChannelEvent;

/// Identifies one subscription within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
pub(crate) struct Hub {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<ChannelEvent>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(id, tx);
        tracing::debug!(subscription = id.0, "subscriber added");
        Subscription {
            id,
            rx: Some(rx),
            hub: Arc::downgrade(self),
        }
    }

    /// Delivers `event` to every current subscriber. Subscribers whose
    /// receiver is gone are pruned.
    pub fn publish(&self, event: &ChannelEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    fn remove(&self, id: SubscriptionId) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::debug!(subscription = id.0, "subscriber removed");
        }
    }

    /// Drops every sender; subscribers see the end of their stream.
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A live subscription to a channel's events.
///
/// Receives every event published from the moment it was created.
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    hub: Weak<Hub>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once unsubscribed or after the channel was closed
    /// and every buffered event has been read.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.rx.as_mut()?.try_recv().ok()
    }

    /// Stops delivery. Idempotent; buffered events are discarded.
    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove(self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_protocol::{RoomEvent, RoomId};

    fn event(id: u64) -> ChannelEvent {
        ChannelEvent::Room(RoomEvent::RoomCreated { id: RoomId(id) })
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let hub = Arc::new(Hub::default());
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(&event(1));

        assert_eq!(a.recv().await, Some(event(1)));
        assert_eq!(b.recv().await, Some(event(1)));
    }

    #[tokio::test]
    async fn test_unsubscribe_one_keeps_the_other() {
        let hub = Arc::new(Hub::default());
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        a.unsubscribe();
        a.unsubscribe();
        hub.publish(&event(2));

        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, Some(event(2)));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_subscription_sees_no_replay() {
        let hub = Arc::new(Hub::default());
        hub.publish(&event(1));
        let mut late = hub.subscribe();
        assert_eq!(late.try_recv(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = Arc::new(Hub::default());
        let sub = hub.subscribe();
        assert_eq!(hub.len(), 1);
        drop(sub);
        assert_eq!(hub.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_ends_streams_after_buffer() {
        let hub = Arc::new(Hub::default());
        let mut a = hub.subscribe();
        hub.publish(&event(3));
        hub.clear();
        assert_eq!(a.recv().await, Some(event(3)));
        assert_eq!(a.recv().await, None);
    }
}
