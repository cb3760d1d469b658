//! Wire protocol for readyroom.
//!
//! This crate defines the events that clients and the server exchange:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`PlayerInfo`],
//!   [`RoomId`]): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about connections or room state.
//!
//! ```text
//! Transport (frames) → Protocol (ClientEvent) → Room (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientEvent, ErrorInfo, PlayerInfo, RoomId, ServerEvent};
