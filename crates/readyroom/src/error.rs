//! Unified error type for the readyroom server.

use readyroom_protocol::ProtocolError;
use readyroom_room::RoomError;
use readyroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ReadyRoomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (bad configuration).
    #[error(transparent)]
    Room(#[from] RoomError),
}
