//! The reconnecting event channel.
//!
//! One [`EventChannel`] owns one spawned connection task. The task loops
//! through connect → read frames → back off, and publishes every decoded
//! frame to the subscriber hub and the event log. Everything the outside
//! world can observe goes through three shared pieces: the hub, the log,
//! and a `watch` channel carrying [`ConnectionState`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gavel_protocol::{Codec, RoomEvent};
use gavel_transport::{Connector, FrameStream, StreamTarget};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::hub::{Hub, Subscription};
use crate::log::{EVENT_LOG_CAPACITY, EventLog, LogEntry};
use crate::state::{ConnectionState, Phase};
use crate::ChannelEvent;

/// Channel tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub backoff: BackoffConfig,
    /// How many recent events [`EventChannel::event_log`] keeps.
    /// Default: [`EVENT_LOG_CAPACITY`].
    pub log_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            log_capacity: EVENT_LOG_CAPACITY,
        }
    }
}

impl ChannelConfig {
    /// Clamp out-of-range values. A zero log capacity becomes 1.
    pub fn validated(mut self) -> Self {
        self.backoff = self.backoff.validated();
        if self.log_capacity == 0 {
            warn!("log_capacity of 0 is invalid, using 1");
            self.log_capacity = 1;
        }
        self
    }
}

/// State shared between the handle and the connection task.
struct Shared {
    hub: Arc<Hub>,
    log: Mutex<EventLog>,
    state: watch::Sender<ConnectionState>,
    closed: AtomicBool,
}

impl Shared {
    /// Applies `change` to the connection state unless the channel was
    /// closed. Returns `false` when the change was dropped.
    fn transition(&self, change: impl FnOnce(&mut ConnectionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.closed.load(Ordering::SeqCst) {
                return false;
            }
            change(state);
            true
        })
    }

    fn deliver(&self, event: ChannelEvent) {
        self.log.lock().push(event.clone());
        self.hub.publish(&event);
    }
}

/// A subscription to the server's push stream that survives connection
/// failures.
///
/// Reconnects on its own with exponential backoff until [`close`] is
/// called or the channel is dropped.
///
/// [`close`]: EventChannel::close
pub struct EventChannel {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    url: String,
}

impl EventChannel {
    /// Starts connecting to `target` in a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open<C, K>(
        connector: C,
        codec: K,
        target: StreamTarget,
        config: ChannelConfig,
    ) -> Self
    where
        C: Connector,
        K: Codec,
    {
        let config = config.validated();
        let (state, _) = watch::channel(ConnectionState::disconnected());
        let shared = Arc::new(Shared {
            hub: Arc::new(Hub::default()),
            log: Mutex::new(EventLog::new(config.log_capacity)),
            state,
            closed: AtomicBool::new(false),
        });

        let url = target.url.clone();
        info!(url = %url, "event channel opening");

        let task = tokio::spawn(run(
            connector,
            codec,
            target,
            Backoff::new(config.backoff),
            Arc::clone(&shared),
        ));

        Self {
            shared,
            task: Mutex::new(Some(task)),
            url,
        }
    }

    /// The stream URL this channel connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Subscribes to events arriving from now on.
    ///
    /// On a closed channel the returned subscription is already finished.
    pub fn subscribe(&self) -> Subscription {
        let mut subscription = self.shared.hub.subscribe();
        if self.is_closed() {
            subscription.unsubscribe();
        }
        subscription
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// A receiver that is notified on every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// The most recent events, oldest first.
    pub fn event_log(&self) -> Vec<LogEntry> {
        self.shared.log.lock().to_vec()
    }

    /// Stops the channel for good.
    ///
    /// Aborts the connection task (dropping any open socket or pending
    /// connect), ends every subscription and moves the state to
    /// [`Phase::Disconnected`]. Calling it again does nothing.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.shared.hub.clear();
        self.shared.state.send_replace(ConnectionState::disconnected());
        info!(url = %self.url, "event channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("url", &self.url)
            .field("state", &*self.shared.state.borrow())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn run<C, K>(
    connector: C,
    codec: K,
    target: StreamTarget,
    mut backoff: Backoff,
    shared: Arc<Shared>,
) where
    C: Connector,
    K: Codec,
{
    loop {
        if !shared.transition(|s| s.phase = Phase::Connecting) {
            return;
        }

        let failure = match connector.connect(&target).await {
            Ok(mut stream) => {
                backoff.reset();
                info!(url = %target.url, conn = %stream.id(), "event channel open");
                if !shared.transition(|s| {
                    s.phase = Phase::Open;
                    s.attempt = 0;
                    s.last_error = None;
                }) {
                    return;
                }

                let failure = pump(&mut stream, &codec, &shared).await;
                if let Err(e) = stream.close().await {
                    debug!(conn = %stream.id(), error = %e, "close after failure");
                }
                failure
            }
            Err(e) => e.to_string(),
        };

        let delay = backoff.next_delay();
        warn!(
            url = %target.url,
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "event channel disconnected, retrying"
        );
        let attempt = backoff.attempt();
        if !shared.transition(|s| {
            s.phase = Phase::Backoff;
            s.attempt = attempt;
            s.last_error = Some(failure);
        }) {
            return;
        }
        tokio::time::sleep(delay).await;
    }
}

/// Reads frames until the connection ends. Returns why it ended.
async fn pump<S, K>(stream: &mut S, codec: &K, shared: &Shared) -> String
where
    S: FrameStream,
    K: Codec,
{
    loop {
        match stream.next_frame().await {
            Ok(Some(frame)) => {
                let event = match codec.decode::<RoomEvent>(&frame) {
                    Ok(event) => {
                        debug!(conn = %stream.id(), kind = event.kind(), "frame received");
                        ChannelEvent::Room(event)
                    }
                    Err(e) => {
                        warn!(conn = %stream.id(), error = %e, "malformed frame");
                        ChannelEvent::Malformed {
                            raw: String::from_utf8_lossy(&frame).into_owned(),
                            error: e.to_string(),
                        }
                    }
                };
                shared.deliver(event);
            }
            Ok(None) => return "server closed the connection".to_owned(),
            Err(e) => return e.to_string(),
        }
    }
}
