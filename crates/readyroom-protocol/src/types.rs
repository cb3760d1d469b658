//! Core protocol types for readyroom's wire format.
//!
//! Every frame is one JSON object, adjacently tagged as
//! `{"event": <name>, "data": <payload>}` with camelCase names so browser
//! clients can use the event names directly.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The name of a room, chosen by clients.
///
/// Opaque to the server: any string is a valid key on the wire. The room
/// layer trims and length-checks it before use.
///
/// `#[serde(transparent)]` keeps it a plain JSON string, so
/// `RoomId::from("R1")` is `"R1"` rather than `{"0":"R1"}`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Returns the room name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// Disconnect has no frame: the server synthesizes it when the
/// connection goes away.
///
/// ```text
/// {"event":"joinRoom","data":{"roomId":"R1","username":"alice"}}
/// {"event":"toggleReady","data":"R1"}
/// {"event":"levelUp","data":{"roomId":"R1","level":3}}
/// {"event":"playerFinished","data":"R1"}
/// {"event":"mistake","data":"R1"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join (creating if needed) a room under a display name.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId, username: String },

    /// Flip the sender's ready flag.
    ToggleReady(RoomId),

    /// Report the sender's current level. Any JSON number; the room
    /// truncates and clamps it.
    #[serde(rename_all = "camelCase")]
    LevelUp { room_id: RoomId, level: f64 },

    /// The sender completed the current game.
    PlayerFinished(RoomId),

    /// The sender made a mistake; the whole room restarts.
    Mistake(RoomId),
}

impl ClientEvent {
    /// The room this event is addressed to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom { room_id, .. } | Self::LevelUp { room_id, .. } => {
                room_id
            }
            Self::ToggleReady(room_id)
            | Self::PlayerFinished(room_id)
            | Self::Mistake(room_id) => room_id,
        }
    }

    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::ToggleReady(_) => "toggleReady",
            Self::LevelUp { .. } => "levelUp",
            Self::PlayerFinished(_) => "playerFinished",
            Self::Mistake(_) => "mistake",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One player as shown to the room in a `roomUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Numeric connection identity of the player.
    pub id: u64,
    pub username: String,
    pub ready: bool,
    pub level: u32,
}

/// Payload of the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// Events the server sends to clients.
///
/// Unit variants carry no `data` field: `{"event":"gameStart"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full player list in join order.
    RoomUpdate(Vec<PlayerInfo>),

    /// Every player was ready and the quorum was met.
    GameStart,

    /// The room won; it is deleted right after this is sent.
    GameWin,

    /// Sent only to a player who finished before the rest of the room.
    WaitingForOthers,

    /// Someone made a mistake; the room is back in the lobby.
    RestartGame,

    /// A frame from this connection could not be understood.
    Error(ErrorInfo),
}

impl ServerEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomUpdate(_) => "roomUpdate",
            Self::GameStart => "gameStart",
            Self::GameWin => "gameWin",
            Self::WaitingForOthers => "waitingForOthers",
            Self::RestartGame => "restartGame",
            Self::Error(_) => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
