//! `GavelClient` builder and entry points.
//!
//! This is the one object an application holds. It ties together all the
//! layers: session → resources → push channel → room state.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gavel_channel::{ChannelConfig, EventChannel};
use gavel_protocol::{JsonCodec, Lot, RoomId, RoomStatus};
use gavel_resource::{HttpAuthBackend, ProductApi, ResourceClient, Room, RoomApi};
use gavel_room::{ReconcilerConfig, RoomReconciler, spawn_room};
use gavel_session::{
    AuthSessionManager, CredentialStore, FileCredentialStore, MemoryCredentialStore, Session,
    SessionConfig,
};
use gavel_transport::{StreamTarget, WebSocketConnector};
use tokio::sync::watch;

use crate::view::RoomView;
use crate::{ClientConfig, GavelError};

/// The session manager as the client wires it.
pub type SessionManager = AuthSessionManager<HttpAuthBackend>;

/// Builder for configuring a [`GavelClient`].
///
/// # Example
///
/// ```rust,no_run
/// use gavel::prelude::*;
///
/// # async fn run() -> Result<(), GavelError> {
/// let client = GavelClient::builder()
///     .base_url("https://auction.example.com")
///     .stream_url("wss://auction.example.com/ws")
///     .credentials_dir("/tmp/gavel")
///     .build()
///     .await?;
/// client.login("alice", "secret").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GavelClientBuilder {
    config: ClientConfig,
}

impl GavelClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the REST API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the push stream endpoint.
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.config.stream_url = url.into();
        self
    }

    /// Persists the session token under `dir`.
    pub fn credentials_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.credentials_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.config.channel = config;
        self
    }

    pub fn reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.config.reconciler = config;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the client.
    ///
    /// If a token was persisted by an earlier run the client starts with
    /// a provisional session and checks it with the server in the
    /// background.
    ///
    /// # Errors
    /// `InvalidConfig` for unusable URLs, `Resource` if the HTTP stack
    /// can't be initialised.
    pub async fn build(self) -> Result<GavelClient, GavelError> {
        let config = self.config.validated()?;

        let http = ResourceClient::new(&config.base_url, config.request_timeout)?;
        let store: Arc<dyn CredentialStore> = match &config.credentials_dir {
            Some(dir) => Arc::new(FileCredentialStore::open(dir)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        let session = Arc::new(AuthSessionManager::new(
            HttpAuthBackend::new(http.clone()),
            store,
            config.session.clone(),
        ));
        let resources = http.with_token_source(session.clone());

        session.spawn_confirmation();
        tracing::info!(base_url = %config.base_url, "gavel client ready");

        Ok(GavelClient {
            inner: Arc::new(Inner {
                products: ProductApi::new(resources.clone()),
                rooms: RoomApi::new(resources.clone()),
                resources,
                session,
                generation: Arc::new(AtomicU64::new(0)),
                config,
            }),
        })
    }
}

struct Inner {
    config: ClientConfig,
    session: Arc<SessionManager>,
    resources: ResourceClient,
    products: ProductApi,
    rooms: RoomApi,
    /// Bumped on every `join_room`; a view whose generation is behind is
    /// stale.
    generation: Arc<AtomicU64>,
}

/// An auction client.
///
/// Cheap to clone; clones share the session and connection pool.
#[derive(Clone)]
pub struct GavelClient {
    inner: Arc<Inner>,
}

impl GavelClient {
    /// Creates a new builder.
    pub fn builder() -> GavelClientBuilder {
        GavelClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // -----------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------

    /// The session manager, for anything the shortcuts below don't cover.
    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.inner.session
    }

    pub fn current_session(&self) -> Arc<Session> {
        self.inner.session.current_session()
    }

    /// Observes sign-in, sign-out and forced logout.
    pub fn watch_session(&self) -> watch::Receiver<Arc<Session>> {
        self.inner.session.subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, GavelError> {
        Ok(self.inner.session.login(username, password).await?)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Arc<Session>, GavelError> {
        Ok(self.inner.session.register(username, password).await?)
    }

    /// Signs out. Open room views keep their connection but their bids
    /// will fail with `NotAuthenticated`.
    pub fn logout(&self) {
        self.inner.session.logout();
    }

    // -----------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------

    /// The authenticated HTTP client.
    pub fn resources(&self) -> &ResourceClient {
        &self.inner.resources
    }

    pub fn products(&self) -> &ProductApi {
        &self.inner.products
    }

    pub fn rooms(&self) -> &RoomApi {
        &self.inner.rooms
    }

    // -----------------------------------------------------------------
    // Live rooms
    // -----------------------------------------------------------------

    /// Opens a live view of `room_id`.
    ///
    /// Fetches the room, connects its push stream and starts a reconciler
    /// for it. Once the room is fetched, any view opened earlier becomes
    /// stale: results of its in-flight bids are dropped. A join that fails
    /// leaves the current view alone.
    ///
    /// # Errors
    /// `NotAuthenticated` when signed out; `Resource` if the room can't
    /// be fetched.
    pub async fn join_room(&self, room_id: RoomId) -> Result<RoomView, GavelError> {
        let session = self.current_session();
        if !session.is_authenticated() {
            return Err(GavelError::NotAuthenticated);
        }
        let room = self.inner.rooms.get(room_id).await?;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let reconciler = self.seed(&room).await;

        let target = StreamTarget::new(self.inner.config.room_stream_url(room_id))
            .with_bearer(session.token().map(str::to_owned));
        let channel = EventChannel::open(
            WebSocketConnector,
            JsonCodec,
            target,
            self.inner.config.channel.clone(),
        );
        let handle = spawn_room(
            reconciler,
            channel.subscribe(),
            self.inner.config.command_buffer,
        );
        tracing::info!(%room_id, generation, status = %room.status, "joined room");

        Ok(RoomView::new(
            room,
            channel,
            handle,
            self.inner.rooms.clone(),
            Arc::clone(&self.inner.session),
            generation,
            Arc::clone(&self.inner.generation),
        ))
    }

    /// Opens the global push stream, used when no room is joined.
    pub fn global_events(&self) -> EventChannel {
        let target = StreamTarget::new(self.inner.config.stream_url.clone())
            .with_bearer(self.inner.session.current_session().token().map(str::to_owned));
        EventChannel::open(
            WebSocketConnector,
            JsonCodec,
            target,
            self.inner.config.channel.clone(),
        )
    }

    /// Builds the initial reconciler state from the fetched room. The
    /// lot's step comes from its product; if that lookup fails the step
    /// defaults to 1.
    async fn seed(&self, room: &Room) -> RoomReconciler {
        let reconciler = RoomReconciler::new(room.id, self.inner.config.reconciler.clone())
            .with_status(room.status);

        let Some(product_id) = room.product_id else {
            return reconciler;
        };
        if room.status == RoomStatus::Waiting {
            return reconciler;
        }

        let (name, min_step) = match self.inner.products.get(product_id).await {
            Ok(product) => (product.name, product.min_step.max(1)),
            Err(e) => {
                tracing::warn!(
                    room_id = %room.id,
                    %product_id,
                    error = %e,
                    "could not load lot details, assuming a step of 1"
                );
                (room.name.clone(), 1)
            }
        };
        let mut lot = Lot::new(product_id, name, room.base_price, min_step);
        lot.current_price = room.current_price.max(room.base_price);
        reconciler.with_active_lot(lot)
    }
}

impl std::fmt::Debug for GavelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GavelClient")
            .field("base_url", &self.inner.config.base_url)
            .field("session", &self.current_session())
            .finish()
    }
}
