//! End-to-end: a real WebSocket server on loopback.

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use gavel_channel::{BackoffConfig, ChannelConfig, ChannelEvent, EventChannel};
use gavel_protocol::{JsonCodec, RoomEvent, RoomId, UserId};
use gavel_transport::{StreamTarget, WebSocketConnector};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

/// Serves two connections: the first sends one event and closes, the
/// second sends another and stays open. Records each upgrade's
/// `Authorization` header.
async fn spawn_server() -> (String, Arc<Mutex<Vec<Option<String>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let headers = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&headers);

    tokio::spawn(async move {
        let frames = [
            r#"{"event":"room_started","id":7}"#,
            r#"{"event":"bid_accepted","room_id":7,"user_id":3,"amount":120,"timestamp":1}"#,
        ];
        for (i, frame) in frames.into_iter().enumerate() {
            let (tcp, _) = listener.accept().await.unwrap();
            let seen = Arc::clone(&seen);
            let callback = move |req: &Request,
                                 resp: Response|
                  -> Result<Response, ErrorResponse> {
                let auth = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                seen.lock().push(auth);
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();
            ws.send(Message::text(frame.to_owned())).await.unwrap();
            if i == 0 {
                ws.close(None).await.unwrap();
            } else {
                // Keep the last connection open for the rest of the test.
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(ws);
                });
            }
        }
    });

    (format!("ws://{addr}/ws?room=7"), headers)
}

#[tokio::test]
async fn test_websocket_channel_reconnects_after_server_close() {
    let (url, headers) = spawn_server().await;
    let config = ChannelConfig {
        backoff: BackoffConfig {
            base: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter_ratio: 0.0,
        },
        ..ChannelConfig::default()
    };
    let target = StreamTarget::new(url).with_bearer(Some("tok".into()));
    let channel = EventChannel::open(WebSocketConnector, JsonCodec, target, config);
    let mut sub = channel.subscribe();

    let first = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap();
    assert_eq!(
        first,
        Some(ChannelEvent::Room(RoomEvent::RoomStarted { id: RoomId(7) }))
    );

    let second = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap();
    match second {
        Some(ChannelEvent::Room(RoomEvent::BidAccepted { user_id, amount, .. })) => {
            assert_eq!(user_id, UserId(3));
            assert_eq!(amount, 120);
        }
        other => panic!("expected BidAccepted, got {other:?}"),
    }

    assert_eq!(
        *headers.lock(),
        vec![Some("Bearer tok".to_owned()), Some("Bearer tok".to_owned())]
    );

    channel.close();
    assert!(channel.is_closed());
}
