//! `ReadyRoomServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → room dispatcher, and
//! back out through each connection's outbox.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use readyroom_protocol::{Codec, JsonCodec};
use readyroom_room::{Dispatcher, Outbound, RoomConfig};
use readyroom_transport::{
    ConnectionId, DEFAULT_HANDSHAKE_TIMEOUT, PendingConnection,
    PendingWebSocket, Transport, TransportError, WebSocketTransport,
};
use tokio::sync::{Mutex, mpsc};

use crate::ReadyRoomError;
use crate::handler::handle_connection;

/// Address used when [`ReadyRoomServerBuilder::bind`] is not called.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// How often idle rooms are swept when a room TTL is configured.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Frames waiting to be written to one connection.
pub(crate) type Outbox = mpsc::UnboundedSender<Vec<u8>>;

/// Shared server state passed to each connection task.
///
/// Every event is handled while holding `dispatcher`, and its outbound
/// frames are queued before the lock is released, so room transitions
/// and their broadcasts never interleave. Lock order: `dispatcher`, then
/// `outboxes`.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) dispatcher: Mutex<Dispatcher>,
    pub(crate) outboxes: Mutex<HashMap<ConnectionId, Outbox>>,
    pub(crate) codec: C,
}

impl<C: Codec> ServerState<C> {
    /// Encodes each outbound event once and queues it for every target.
    ///
    /// Fire-and-forget: targets whose connection is already gone are
    /// skipped.
    pub(crate) async fn deliver(&self, outbound: Vec<Outbound>) {
        if outbound.is_empty() {
            return;
        }
        let outboxes = self.outboxes.lock().await;
        for Outbound { targets, event, .. } in outbound {
            let bytes = match self.codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(
                        event = event.name(),
                        error = %e,
                        "failed to encode event"
                    );
                    continue;
                }
            };
            for target in targets {
                if let Some(outbox) = outboxes.get(&target) {
                    let _ = outbox.send(bytes.clone());
                }
            }
        }
    }
}

/// Builder for configuring and starting a readyroom server.
///
/// # Example
///
/// ```rust,ignore
/// let server = ReadyRoomServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ReadyRoomServerBuilder {
    bind_addr: String,
    allowed_origin: Option<String>,
    room_config: RoomConfig,
    sweep_interval: Duration,
    handshake_timeout: Duration,
}

impl ReadyRoomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            allowed_origin: None,
            room_config: RoomConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Only accept browser connections from this origin.
    pub fn allowed_origin(mut self, origin: &str) -> Self {
        self.allowed_origin = Some(origin.to_string());
        self
    }

    /// Sets the room configuration (quorum, limits, idle TTL).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how often idle rooms are swept. Only used when the room
    /// config has a TTL.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets how long a new client may take to complete the WebSocket
    /// upgrade before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Validates the configuration and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(
        self,
    ) -> Result<ReadyRoomServer<JsonCodec>, ReadyRoomError> {
        let dispatcher = Dispatcher::new(self.room_config)?;

        let mut transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        if let Some(origin) = self.allowed_origin {
            tracing::info!(%origin, "origin allow-list enabled");
            transport = transport.with_allowed_origin(origin);
        }

        let state = Arc::new(ServerState {
            dispatcher: Mutex::new(dispatcher),
            outboxes: Mutex::new(HashMap::new()),
            codec: JsonCodec,
        });

        Ok(ReadyRoomServer {
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for ReadyRoomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound readyroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ReadyRoomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    sweep_interval: Duration,
}

impl ReadyRoomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ReadyRoomServerBuilder {
        ReadyRoomServerBuilder::new()
    }
}

impl<C: Codec> ReadyRoomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns one task per connection, plus the idle-room sweep when a
    /// TTL is configured. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ReadyRoomError> {
        tracing::info!("readyroom server running");

        let ttl = self.state.dispatcher.lock().await.config().room_ttl;
        if let Some(ttl) = ttl {
            tracing::info!(
                ?ttl,
                interval = ?self.sweep_interval,
                "idle-room sweep enabled"
            );
            tokio::spawn(sweep_idle_rooms(
                Arc::clone(&self.state),
                self.sweep_interval,
            ));
        }

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(serve_connection(pending, state));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Completes the handshake for one accepted socket, then hands the
/// connection to the handler. Runs in its own task per socket.
async fn serve_connection<C: Codec>(
    pending: PendingWebSocket,
    state: Arc<ServerState<C>>,
) {
    let peer = pending.peer_addr();
    let conn = match pending.upgrade().await {
        Ok(conn) => conn,
        Err(TransportError::OriginRejected(origin)) => {
            tracing::warn!(
                %peer,
                %origin,
                "connection refused: origin not allowed"
            );
            return;
        }
        Err(e) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return;
        }
    };
    if let Err(e) = handle_connection(conn, state).await {
        tracing::debug!(error = %e, "connection ended with error");
    }
}

/// Periodically deletes rooms that have been idle past the TTL.
async fn sweep_idle_rooms<C: Codec>(
    state: Arc<ServerState<C>>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let expired = state.dispatcher.lock().await.expire_idle(Instant::now());
        if !expired.is_empty() {
            tracing::info!(rooms = expired.len(), "idle rooms expired");
        }
    }
}
