//! Room configuration, input limits, and the lobby/in-game phase.

use std::time::Duration;

use readyroom_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Display name used when a client's username is empty after cleanup.
pub const DEFAULT_USERNAME: &str = "player";

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room of a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Quorum to start: the minimum number of players that must all be
    /// ready before a room leaves the lobby. Zero behaves as one.
    pub quorum: usize,

    /// Highest level a `levelUp` may set. Larger values are clamped.
    pub max_level: u32,

    /// Optional level-threshold win: when set to `n`, an active room
    /// wins as soon as every player's level exceeds `n`.
    pub win_level: Option<u32>,

    /// Usernames are truncated to this many characters.
    pub max_username_len: usize,

    /// Room ids longer than this many characters are rejected.
    pub max_room_id_len: usize,

    /// Rooms idle for longer than this are expired by the sweep.
    /// `None` disables expiry.
    pub room_ttl: Option<Duration>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            quorum: 2,
            max_level: 100,
            win_level: None,
            max_username_len: 32,
            max_room_id_len: 64,
            room_ttl: None,
        }
    }
}

impl RoomConfig {
    /// Checks that the limits leave room for valid input.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.max_level == 0 {
            return Err(RoomError::InvalidConfig(
                "max_level must be at least 1".into(),
            ));
        }
        if self.max_username_len == 0 {
            return Err(RoomError::InvalidConfig(
                "max_username_len must be at least 1".into(),
            ));
        }
        if self.max_room_id_len == 0 {
            return Err(RoomError::InvalidConfig(
                "max_room_id_len must be at least 1".into(),
            ));
        }
        if self.room_ttl == Some(Duration::ZERO) {
            return Err(RoomError::InvalidConfig(
                "room_ttl must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The effective quorum (never below one).
    pub fn effective_quorum(&self) -> usize {
        self.quorum.max(1)
    }

    /// Normalizes a client-supplied room id: trims whitespace and
    /// rejects empty or over-long names.
    pub fn room_id(&self, raw: &RoomId) -> Result<RoomId, RoomError> {
        let trimmed = raw.as_str().trim();
        if trimmed.is_empty() {
            return Err(RoomError::InvalidInput("room id is empty".into()));
        }
        if trimmed.chars().count() > self.max_room_id_len {
            return Err(RoomError::InvalidInput(format!(
                "room id longer than {} characters",
                self.max_room_id_len
            )));
        }
        Ok(RoomId::from(trimmed))
    }

    /// Cleans a client-supplied username: strips control characters,
    /// trims, and truncates. Never fails.
    pub fn username(&self, raw: &str) -> String {
        let cleaned: String =
            raw.chars().filter(|c| !c.is_control()).collect();
        let name: String = cleaned
            .trim()
            .chars()
            .take(self.max_username_len)
            .collect();
        let name = name.trim_end();
        if name.is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            name.to_string()
        }
    }

    /// Truncates a client-supplied level and clamps it into
    /// `1..=max_level`.
    pub fn level(&self, raw: f64) -> u32 {
        let max = self.max_level.max(1);
        if raw.is_nan() {
            return 1;
        }
        raw.trunc().clamp(1.0, f64::from(max)) as u32
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its game cycle.
///
/// ```text
/// Lobby ──(everyone ready, quorum met)──→ InGame
///   ↑                                        │
///   └──────────────(mistake)─────────────────┘
/// ```
///
/// A win deletes the room instead of changing its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Lobby,
    InGame,
}

impl RoomPhase {
    /// Returns `true` while a game is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InGame)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::InGame => write!(f, "InGame"),
        }
    }
}
