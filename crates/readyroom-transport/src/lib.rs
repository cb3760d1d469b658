//! Connection transport for readyroom.
//!
//! Provides the [`Transport`], [`PendingConnection`] and [`Connection`]
//! traits the server is written against, plus the opaque
//! [`ConnectionId`] that identifies a player for the lifetime of its
//! connection.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;

/// Opaque identifier for a connection.
///
/// Unique per live connection. The room layer uses it as the player's
/// identity key, so it is passed explicitly into every event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted socket that still has to complete its handshake.
    type Pending: PendingConnection<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    ///
    /// Returns as soon as the socket is accepted. The protocol handshake
    /// is left to [`PendingConnection::upgrade`], which callers run off
    /// the accept loop.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted socket whose handshake has not run yet.
pub trait PendingConnection: Send + 'static {
    /// The connection produced by a successful handshake.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake. Bounded by the transport's handshake
    /// timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive message frames.
///
/// `send` and `recv` may be awaited concurrently from different tasks.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one message frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
