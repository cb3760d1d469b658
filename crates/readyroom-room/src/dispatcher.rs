//! Event dispatcher: folds client events into room state and decides who
//! hears about it.
//!
//! Every handler runs to completion against the registry before the next
//! event is looked at; the caller provides that exclusivity (the server
//! holds the dispatcher behind one lock). Handlers never fail. Events for
//! an unknown room or from a connection that is not a player there are
//! dropped with a debug log.

use std::time::Instant;

use readyroom_protocol::{ClientEvent, RoomId, ServerEvent};
use readyroom_transport::ConnectionId;

use crate::{BroadcastGroups, RoomConfig, RoomError, RoomRegistry};

/// Who an outbound event was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Everyone subscribed to the room's broadcast group.
    Room(RoomId),
    /// A single connection.
    Connection(ConnectionId),
}

/// An event ready for delivery.
///
/// `targets` is the recipient resolved at the moment of emission, so a
/// `gameWin` still reaches the whole room even though the room's group
/// is gone by the time the caller delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub targets: Vec<ConnectionId>,
    pub event: ServerEvent,
}

impl Outbound {
    /// Returns `true` for room-wide broadcasts.
    pub fn is_broadcast(&self) -> bool {
        matches!(self.recipient, Recipient::Room(_))
    }
}

/// Owns the room registry and broadcast groups and applies the room
/// state machine to incoming events.
#[derive(Debug)]
pub struct Dispatcher {
    config: RoomConfig,
    registry: RoomRegistry,
    groups: BroadcastGroups,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty registry.
    pub fn new(config: RoomConfig) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: RoomRegistry::new(),
            groups: BroadcastGroups::new(),
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn groups(&self) -> &BroadcastGroups {
        &self.groups
    }

    /// Handles one client event from `conn`.
    pub fn handle(
        &mut self,
        conn: ConnectionId,
        event: ClientEvent,
    ) -> Vec<Outbound> {
        self.handle_at(conn, event, Instant::now())
    }

    /// [`handle`](Self::handle) with an explicit clock reading.
    pub fn handle_at(
        &mut self,
        conn: ConnectionId,
        event: ClientEvent,
        now: Instant,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();

        let room_id = match self.config.room_id(event.room_id()) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(
                    %conn,
                    event = event.name(),
                    error = %e,
                    "event dropped"
                );
                return out;
            }
        };

        match event {
            ClientEvent::JoinRoom { username, .. } => {
                self.join(conn, &room_id, &username, now, &mut out);
            }
            ClientEvent::ToggleReady(_) => {
                self.toggle_ready(conn, &room_id, now, &mut out);
            }
            ClientEvent::LevelUp { level, .. } => {
                self.level_up(conn, &room_id, level, now, &mut out);
            }
            ClientEvent::PlayerFinished(_) => {
                self.player_finished(conn, &room_id, now, &mut out);
            }
            ClientEvent::Mistake(_) => {
                self.mistake(conn, &room_id, now, &mut out);
            }
        }

        out
    }

    /// Removes a departed connection from every room it played in.
    ///
    /// Rooms left empty are deleted. The others get a `roomUpdate`, and
    /// a room whose remaining players have all finished wins.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        self.disconnect_at(conn, Instant::now())
    }

    /// [`disconnect`](Self::disconnect) with an explicit clock reading.
    pub fn disconnect_at(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        let rooms = self.registry.rooms_of(conn);
        self.groups.unsubscribe_all(conn);

        for room_id in &rooms {
            let Some(room) = self.registry.get_mut(room_id) else {
                continue;
            };
            room.remove_player(conn);
            room.touch(now);

            if room.is_empty() {
                self.registry.remove(room_id);
                self.groups.dissolve(room_id);
                continue;
            }

            let won = room.all_finished();
            let snapshot = room.snapshot();
            let update = ServerEvent::RoomUpdate(snapshot);
            self.broadcast(room_id, update, &mut out);
            if won {
                tracing::info!(%room_id, "remaining players already finished");
                self.win(room_id, &mut out);
            }
        }

        tracing::info!(%conn, rooms = rooms.len(), "connection left");
        out
    }

    /// Deletes rooms idle longer than the configured TTL. No messages
    /// are sent. Does nothing when no TTL is configured.
    pub fn expire_idle(&mut self, now: Instant) -> Vec<RoomId> {
        let Some(ttl) = self.config.room_ttl else {
            return Vec::new();
        };
        let expired = self.registry.expire_idle(now, ttl);
        for room_id in &expired {
            self.groups.dissolve(room_id);
        }
        expired
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    fn join(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        username: &str,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let username = self.config.username(username);
        let room = self.registry.get_or_create(room_id, now);
        let appended = room.join(conn, username.clone());
        room.touch(now);
        let snapshot = room.snapshot();

        self.groups.subscribe(room_id, conn);
        if appended {
            tracing::info!(
                %conn,
                %room_id,
                %username,
                players = snapshot.len(),
                "player joined"
            );
        } else {
            tracing::debug!(
                %conn,
                %room_id,
                %username,
                "repeat join, entry kept"
            );
        }
        self.broadcast(room_id, ServerEvent::RoomUpdate(snapshot), out);
    }

    fn toggle_ready(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let quorum = self.config.effective_quorum();
        let Some(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "toggleReady for unknown room");
            return;
        };
        let Some(player) = room.player_mut(conn) else {
            tracing::debug!(%conn, %room_id, "toggleReady from non-player");
            return;
        };
        player.ready = !player.ready;
        tracing::debug!(%conn, %room_id, ready = player.ready, "ready toggled");
        room.touch(now);

        let started = room.can_start(quorum);
        if started {
            room.start_game();
            tracing::info!(
                %room_id,
                players = room.players().len(),
                "game started"
            );
        }
        let snapshot = room.snapshot();

        if started {
            self.broadcast(room_id, ServerEvent::GameStart, out);
        }
        self.broadcast(room_id, ServerEvent::RoomUpdate(snapshot), out);
    }

    fn level_up(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        level: f64,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let level = self.config.level(level);
        let win_level = self.config.win_level;
        let Some(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "levelUp for unknown room");
            return;
        };
        let Some(player) = room.player_mut(conn) else {
            tracing::debug!(%conn, %room_id, "levelUp from non-player");
            return;
        };
        player.level = level;
        room.touch(now);

        let won = match win_level {
            Some(threshold) => {
                room.is_active() && room.all_above_level(threshold)
            }
            None => false,
        };
        let snapshot = room.snapshot();

        self.broadcast(room_id, ServerEvent::RoomUpdate(snapshot), out);
        if won {
            tracing::info!(%room_id, "every player passed the win level");
            self.win(room_id, out);
        }
    }

    fn player_finished(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let Some(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "playerFinished for unknown room");
            return;
        };
        if !room.mark_finished(conn) {
            tracing::debug!(%conn, %room_id, "playerFinished from non-player");
            return;
        }
        room.touch(now);

        let done = room.all_finished();
        tracing::info!(
            %conn,
            %room_id,
            finished = room.finished().len(),
            players = room.players().len(),
            "player finished"
        );

        if done {
            self.win(room_id, out);
        } else {
            self.send_to(conn, ServerEvent::WaitingForOthers, out);
        }
    }

    fn mistake(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        now: Instant,
        out: &mut Vec<Outbound>,
    ) {
        let Some(room) = self.registry.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "mistake for unknown room");
            return;
        };
        room.restart();
        room.touch(now);
        tracing::info!(%conn, %room_id, "mistake, room back to lobby");

        self.broadcast(room_id, ServerEvent::RestartGame, out);
    }

    // -----------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------

    /// Broadcasts `gameWin`, then deletes the room and its group.
    fn win(&mut self, room_id: &RoomId, out: &mut Vec<Outbound>) {
        tracing::info!(%room_id, "game won");
        self.broadcast(room_id, ServerEvent::GameWin, out);
        self.registry.remove(room_id);
        self.groups.dissolve(room_id);
    }

    fn broadcast(
        &self,
        room_id: &RoomId,
        event: ServerEvent,
        out: &mut Vec<Outbound>,
    ) {
        let targets = self.groups.members(room_id).to_vec();
        tracing::trace!(
            %room_id,
            event = event.name(),
            recipients = targets.len(),
            "broadcast"
        );
        out.push(Outbound {
            recipient: Recipient::Room(room_id.clone()),
            targets,
            event,
        });
    }

    fn send_to(
        &self,
        conn: ConnectionId,
        event: ServerEvent,
        out: &mut Vec<Outbound>,
    ) {
        tracing::trace!(%conn, event = event.name(), "send");
        out.push(Outbound {
            recipient: Recipient::Connection(conn),
            targets: vec![conn],
            event,
        });
    }
}
