use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding, accepting, or upgrading a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade carried an `Origin` that is not allow-listed.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// The peer did not finish the WebSocket handshake in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimedOut(Duration),
}
