//! Room and player records.
//!
//! These are plain data plus the small queries the dispatcher needs.
//! They never emit messages themselves.

use std::collections::HashSet;
use std::time::Instant;

use readyroom_protocol::{PlayerInfo, RoomId};
use readyroom_transport::ConnectionId;

use crate::RoomPhase;

/// Level every player starts a game at.
pub const STARTING_LEVEL: u32 = 1;

/// One connected participant of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Identity key: unique per live connection.
    pub id: ConnectionId,
    pub username: String,
    pub ready: bool,
    pub level: u32,
}

impl Player {
    /// A fresh, not-ready player at the starting level.
    pub fn new(id: ConnectionId, username: String) -> Self {
        Self {
            id,
            username,
            ready: false,
            level: STARTING_LEVEL,
        }
    }

    /// The wire view of this player.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.into_inner(),
            username: self.username.clone(),
            ready: self.ready,
            level: self.level,
        }
    }
}

/// Shared state of one room.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    /// Join order; unique by connection.
    players: Vec<Player>,
    active: bool,
    /// Connections that finished the current game. Always a subset of
    /// `players`.
    finished: HashSet<ConnectionId>,
    last_activity: Instant,
}

impl Room {
    /// An empty lobby.
    pub fn new(id: RoomId, now: Instant) -> Self {
        Self {
            id,
            players: Vec::new(),
            active: false,
            finished: HashSet::new(),
            last_activity: now,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.player(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> RoomPhase {
        if self.active { RoomPhase::InGame } else { RoomPhase::Lobby }
    }

    pub fn finished(&self) -> &HashSet<ConnectionId> {
        &self.finished
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Adds a player, or renames the existing one if this connection has
    /// already joined. Returns `true` when a new entry was appended.
    pub(crate) fn join(&mut self, id: ConnectionId, username: String) -> bool {
        if let Some(existing) = self.player_mut(id) {
            existing.username = username;
            return false;
        }
        self.players.push(Player::new(id, username));
        true
    }

    /// Removes a player and forgets whether they finished.
    pub(crate) fn remove_player(&mut self, id: ConnectionId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        self.finished.remove(&id);
        Some(self.players.remove(index))
    }

    /// Everyone is ready and there are at least `quorum` players.
    pub fn can_start(&self, quorum: usize) -> bool {
        self.players.len() >= quorum.max(1)
            && self.players.iter().all(|p| p.ready)
    }

    /// Enters the game: resets every player's ready flag and level and
    /// clears finishers left over from an earlier attempt.
    pub(crate) fn start_game(&mut self) {
        self.active = true;
        self.finished.clear();
        for player in &mut self.players {
            player.ready = false;
            player.level = STARTING_LEVEL;
        }
    }

    /// Back to the lobby. Player fields are left as they are.
    pub(crate) fn restart(&mut self) {
        self.active = false;
    }

    /// Records a finisher. Non-members are ignored.
    pub(crate) fn mark_finished(&mut self, id: ConnectionId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.finished.insert(id);
        true
    }

    /// Every current player has finished (and there is at least one).
    pub fn all_finished(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|p| self.finished.contains(&p.id))
    }

    /// Every current player's level is strictly above `threshold`.
    pub fn all_above_level(&self, threshold: u32) -> bool {
        !self.players.is_empty()
            && self.players.iter().all(|p| p.level > threshold)
    }

    /// The player list as sent in `roomUpdate`.
    pub fn snapshot(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::info).collect()
    }
}
