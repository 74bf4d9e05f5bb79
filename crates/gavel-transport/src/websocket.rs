//! WebSocket connector implementation using `tokio-tungstenite`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;

use crate::{ConnectionId, Connector, FrameStream, StreamTarget, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Installs `ring` as the process-wide rustls provider, once. `wss://`
/// handshakes build their TLS config from that default.
fn install_crypto_provider() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        if let Err(existing) = rustls::crypto::ring::default_provider().install_default() {
            tracing::debug!(?existing, "rustls crypto provider already installed");
        }
    });
}

/// A [`Connector`] that dials `ws://` / `wss://` URLs. TLS uses rustls
/// with the webpki root certificates.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Stream = WebSocketFrames;

    async fn connect(
        &self,
        target: &StreamTarget,
    ) -> Result<Self::Stream, TransportError> {
        let mut request = target
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidTarget(e.to_string()))?;

        if request.uri().scheme_str() == Some("wss") {
            install_crypto_provider();
        }

        if let Some(token) = &target.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidTarget(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, url = %target.url, "WebSocket connected");

        Ok(WebSocketFrames { id, ws })
    }
}

/// An open WebSocket connection to the push stream.
pub struct WebSocketFrames {
    id: ConnectionId,
    ws: WsStream,
}

impl FrameStream for WebSocketFrames {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        use futures_util::StreamExt;
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.ws.close(None).await.map_err(|e| {
            TransportError::CloseFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
