//! Room registry: the in-memory table of live rooms.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use readyroom_protocol::RoomId;
use readyroom_transport::ConnectionId;

use crate::Room;

/// Owns every [`Room`], keyed by room id.
///
/// A room is present from its first join until it wins, empties, or
/// expires. Not thread-safe on its own; the server keeps it behind a
/// single lock together with the broadcast groups.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room, creating an empty lobby if it does not exist.
    pub fn get_or_create(
        &mut self,
        room_id: &RoomId,
        now: Instant,
    ) -> &mut Room {
        self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(%room_id, "room created");
            Room::new(room_id.clone(), now)
        })
    }

    /// Looks up a room without creating it.
    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Mutable lookup without creation.
    pub fn get_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Deletes a room and all of its state.
    pub fn remove(&mut self, room_id: &RoomId) -> Option<Room> {
        let removed = self.rooms.remove(room_id);
        if removed.is_some() {
            tracing::info!(%room_id, "room deleted");
        }
        removed
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns the number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Ids of every room in which `conn` is a player, sorted.
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.contains(conn))
            .map(|room| room.id().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Removes rooms with no activity for longer than `ttl` and returns
    /// their ids, sorted.
    pub fn expire_idle(&mut self, now: Instant, ttl: Duration) -> Vec<RoomId> {
        let mut expired: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| {
                now.saturating_duration_since(room.last_activity()) > ttl
            })
            .map(|room| room.id().clone())
            .collect();
        expired.sort();

        for room_id in &expired {
            self.rooms.remove(room_id);
            tracing::info!(%room_id, "room expired (idle)");
        }
        expired
    }
}
