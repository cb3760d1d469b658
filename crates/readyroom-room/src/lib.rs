//! Room registry and event dispatcher for readyroom.
//!
//! Clients join a named room, toggle ready, report level progress, and
//! finish. This crate holds the shared state of every room and decides,
//! for each inbound event, how the room changes and which connections
//! are told about it. It does no I/O: the server feeds it events and
//! delivers the [`Outbound`] messages it returns.
//!
//! # Key types
//!
//! - [`Dispatcher`]: applies client events and disconnects to rooms
//! - [`RoomRegistry`]: room id → [`Room`], create on first join
//! - [`BroadcastGroups`]: room id → subscribed connections
//! - [`RoomConfig`]: quorum to start, input limits, idle expiry
//! - [`RoomPhase`]: `Lobby` / `InGame`

mod config;
mod dispatcher;
mod error;
mod groups;
mod registry;
mod room;

pub use config::{DEFAULT_USERNAME, RoomConfig, RoomPhase};
pub use dispatcher::{Dispatcher, Outbound, Recipient};
pub use error::RoomError;
pub use groups::BroadcastGroups;
pub use registry::RoomRegistry;
pub use room::{Player, Room, STARTING_LEVEL};
