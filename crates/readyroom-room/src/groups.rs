//! Broadcast groups: which connections receive a room's broadcasts.

use std::collections::HashMap;

use readyroom_protocol::RoomId;
use readyroom_transport::ConnectionId;

/// Room-scoped multicast membership.
///
/// Members are kept in subscription order so a broadcast is delivered
/// to connections in a deterministic order.
#[derive(Debug, Default)]
pub struct BroadcastGroups {
    groups: HashMap<RoomId, Vec<ConnectionId>>,
}

impl BroadcastGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to the room's group. Subscribing twice is a no-op.
    pub fn subscribe(&mut self, room_id: &RoomId, conn: ConnectionId) {
        let members = self.groups.entry(room_id.clone()).or_default();
        if !members.contains(&conn) {
            members.push(conn);
        }
    }

    /// Removes `conn` from every group and drops groups left empty.
    pub fn unsubscribe_all(&mut self, conn: ConnectionId) {
        self.groups.retain(|_, members| {
            members.retain(|c| *c != conn);
            !members.is_empty()
        });
    }

    /// Deletes the room's group entirely.
    pub fn dissolve(&mut self, room_id: &RoomId) {
        self.groups.remove(room_id);
    }

    /// Current members of the room's group, in subscription order.
    pub fn members(&self, room_id: &RoomId) -> &[ConnectionId] {
        self.groups.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
