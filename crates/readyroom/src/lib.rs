//! # readyroom
//!
//! A small multiplayer session server. Clients join a named room over a
//! WebSocket, toggle ready, report level progress, and finish; the server
//! keeps each room's shared state and broadcasts every transition to the
//! room's members.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use readyroom::prelude::*;
//!
//! # async fn run() -> Result<(), ReadyRoomError> {
//! let server = ReadyRoomServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .allowed_origin("https://game.example")
//!     .room_config(RoomConfig {
//!         quorum: 2,
//!         ..RoomConfig::default()
//!     })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ReadyRoomError;
pub use server::{DEFAULT_BIND_ADDR, ReadyRoomServer, ReadyRoomServerBuilder};

/// Re-exports of the types needed to configure and talk to a server.
pub mod prelude {
    pub use crate::{ReadyRoomError, ReadyRoomServer, ReadyRoomServerBuilder};
    pub use readyroom_protocol::{
        ClientEvent, ErrorInfo, PlayerInfo, RoomId, ServerEvent,
    };
    pub use readyroom_room::{RoomConfig, RoomPhase};
    pub use readyroom_transport::ConnectionId;
}
