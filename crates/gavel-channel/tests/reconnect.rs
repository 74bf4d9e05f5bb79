//! Channel behaviour against a scripted in-memory connector.
//!
//! Timing tests run on a paused clock, so backoff delays are exact.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gavel_channel::{
    BackoffConfig, ChannelConfig, ChannelEvent, EventChannel, Phase,
};
use gavel_protocol::{JsonCodec, RoomEvent, RoomId};
use gavel_transport::{
    ConnectionId, Connector, FrameStream, StreamTarget, TransportError,
};
use parking_lot::Mutex;
use tokio::time::Instant;

// =========================================================================
// Scripted transport
// =========================================================================

enum Step {
    /// The connect attempt fails.
    Refuse,
    /// The connect attempt never completes.
    Stall,
    /// Connects, delivers the frames, then the server closes.
    Serve(Vec<&'static str>),
    /// Connects, delivers the frames, then stays open.
    Hold(Vec<&'static str>),
}

#[derive(Clone, Default)]
struct Script {
    steps: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    dropped: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl Script {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            ..Self::default()
        }
    }

    fn gaps_ms(&self) -> Vec<u64> {
        self.attempts
            .lock()
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect()
    }

    fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

struct ScriptedStream {
    id: ConnectionId,
    frames: VecDeque<&'static str>,
    hold: bool,
    dropped: Arc<AtomicBool>,
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

impl FrameStream for ScriptedStream {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(frame) = self.frames.pop_front() {
            return Ok(Some(frame.as_bytes().to_vec()));
        }
        if self.hold {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Connector for Script {
    type Stream = ScriptedStream;

    async fn connect(
        &self,
        _target: &StreamTarget,
    ) -> Result<ScriptedStream, TransportError> {
        self.attempts.lock().push(Instant::now());
        let step = self.steps.lock().pop_front().unwrap_or(Step::Refuse);
        let (frames, hold) = match step {
            Step::Refuse => {
                return Err(TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )));
            }
            Step::Stall => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Step::Serve(frames) => (frames, false),
            Step::Hold(frames) => (frames, true),
        };
        Ok(ScriptedStream {
            id: ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed)),
            frames: frames.into(),
            hold,
            dropped: Arc::clone(&self.dropped),
        })
    }
}

fn config(base_ms: u64) -> ChannelConfig {
    ChannelConfig {
        backoff: BackoffConfig {
            base: Duration::from_millis(base_ms),
            max_delay: Duration::from_secs(10),
            jitter_ratio: 0.0,
        },
        ..ChannelConfig::default()
    }
}

fn open(script: &Script, config: ChannelConfig) -> EventChannel {
    EventChannel::open(
        script.clone(),
        JsonCodec,
        StreamTarget::new("ws://scripted/ws?room=7"),
        config,
    )
}

const STARTED: &str = r#"{"event":"room_started","id":7}"#;
const LEFT: &str = r#"{"event":"participant_left","room_id":7,"user_id":2}"#;

// =========================================================================
// Backoff and state machine
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_delays_double_then_reset_after_open() {
    let script = Script::new(vec![
        Step::Refuse,
        Step::Refuse,
        Step::Refuse,
        Step::Serve(vec![]),
        Step::Refuse,
        Step::Hold(vec![]),
    ]);
    let channel = open(&script, config(100));

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(script.attempt_count(), 6);
    assert_eq!(script.gaps_ms(), vec![100, 200, 400, 100, 200]);

    let state = channel.state();
    assert_eq!(state.phase, Phase::Open);
    assert_eq!(state.attempt, 0);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_connect_reports_backoff_state() {
    let script = Script::new(vec![Step::Refuse, Step::Hold(vec![])]);
    let channel = open(&script, config(100));
    let mut states = channel.watch_state();

    let backoff = states
        .wait_for(|s| s.phase == Phase::Backoff)
        .await
        .unwrap()
        .clone();
    assert_eq!(backoff.attempt, 1);
    assert!(backoff.last_error.unwrap().contains("refused"));

    states.wait_for(|s| s.is_open()).await.unwrap();
    assert_eq!(channel.state().attempt, 0);
}

#[tokio::test(start_paused = true)]
async fn test_delays_stop_growing_at_cap() {
    let script = Script::new(vec![]);
    let mut config = config(100);
    config.backoff.max_delay = Duration::from_millis(300);
    let _channel = open(&script, config);

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let gaps = script.gaps_ms();
    assert!(gaps.len() >= 4);
    assert_eq!(&gaps[..4], &[100, 200, 300, 300]);
}

// =========================================================================
// Delivery
// =========================================================================

#[tokio::test]
async fn test_malformed_frame_does_not_break_connection() {
    let script = Script::new(vec![Step::Hold(vec!["not json", STARTED])]);
    let channel = open(&script, config(100));
    let mut sub = channel.subscribe();

    match sub.recv().await {
        Some(ChannelEvent::Malformed { raw, error }) => {
            assert_eq!(raw, "not json");
            assert!(!error.is_empty());
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
    assert_eq!(
        sub.recv().await,
        Some(ChannelEvent::Room(RoomEvent::RoomStarted { id: RoomId(7) }))
    );

    assert_eq!(script.attempt_count(), 1);
    assert!(channel.state().is_open());

    let log = channel.event_log();
    assert_eq!(log.len(), 2);
    assert!(log[0].event.is_malformed());
}

#[tokio::test]
async fn test_unsubscribe_does_not_affect_other_subscriber() {
    let script = Script::new(vec![Step::Hold(vec![STARTED, LEFT])]);
    let channel = open(&script, config(100));
    let mut first = channel.subscribe();
    let mut second = channel.subscribe();

    first.unsubscribe();
    first.unsubscribe();

    let a = second.recv().await.unwrap();
    let b = second.recv().await.unwrap();
    assert_eq!(a.as_room_event().map(RoomEvent::kind), Some("room_started"));
    assert_eq!(b.as_room_event().map(RoomEvent::kind), Some("participant_left"));
    assert_eq!(first.recv().await, None);
    assert!(channel.state().is_open());
}

// =========================================================================
// Close
// =========================================================================

#[tokio::test]
async fn test_close_twice_is_harmless_and_drops_connection() {
    let script = Script::new(vec![Step::Hold(vec![])]);
    let channel = open(&script, config(100));
    let mut sub = channel.subscribe();
    channel.watch_state().wait_for(|s| s.is_open()).await.unwrap();

    channel.close();
    channel.close();

    assert!(channel.is_closed());
    assert_eq!(channel.state().phase, Phase::Disconnected);
    assert_eq!(sub.recv().await, None);

    tokio::time::timeout(Duration::from_secs(1), async {
        while !script.dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("socket should be released");

    let mut late = channel.subscribe();
    assert_eq!(late.recv().await, None);
}

#[tokio::test]
async fn test_close_during_pending_connect_abandons_it() {
    let script = Script::new(vec![Step::Stall]);
    let channel = open(&script, config(100));
    let mut states = channel.watch_state();
    states
        .wait_for(|s| s.phase == Phase::Connecting)
        .await
        .unwrap();

    channel.close();

    assert_eq!(channel.state().phase, Phase::Disconnected);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.state().phase, Phase::Disconnected);
    assert_eq!(script.attempt_count(), 1);
}

#[tokio::test]
async fn test_drop_closes_channel() {
    let script = Script::new(vec![Step::Hold(vec![])]);
    let channel = open(&script, config(100));
    let mut sub = channel.subscribe();
    channel.watch_state().wait_for(|s| s.is_open()).await.unwrap();

    drop(channel);

    assert_eq!(sub.recv().await, None);
}
