//! Integration tests for the room system, driving the dispatcher the way
//! the server does: one event at a time, checking the outbound messages.

use readyroom_protocol::{ClientEvent, RoomId, ServerEvent};
use readyroom_room::{Dispatcher, Outbound, Recipient, RoomConfig, RoomPhase};
use readyroom_transport::ConnectionId;

// =========================================================================
// Helpers
// =========================================================================

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn room(name: &str) -> RoomId {
    RoomId::from(name)
}

fn dispatcher_with_quorum(quorum: usize) -> Dispatcher {
    Dispatcher::new(RoomConfig {
        quorum,
        ..RoomConfig::default()
    })
    .unwrap()
}

fn dispatcher_with_win_level(win_level: u32) -> Dispatcher {
    Dispatcher::new(RoomConfig {
        win_level: Some(win_level),
        ..RoomConfig::default()
    })
    .unwrap()
}

fn join(
    d: &mut Dispatcher,
    id: u64,
    room_id: &str,
    name: &str,
) -> Vec<Outbound> {
    let event = ClientEvent::JoinRoom {
        room_id: room(room_id),
        username: name.into(),
    };
    d.handle(conn(id), event)
}

fn toggle(d: &mut Dispatcher, id: u64, room_id: &str) -> Vec<Outbound> {
    d.handle(conn(id), ClientEvent::ToggleReady(room(room_id)))
}

fn finish(d: &mut Dispatcher, id: u64, room_id: &str) -> Vec<Outbound> {
    d.handle(conn(id), ClientEvent::PlayerFinished(room(room_id)))
}

fn level_up(
    d: &mut Dispatcher,
    id: u64,
    room_id: &str,
    level: f64,
) -> Vec<Outbound> {
    let event = ClientEvent::LevelUp {
        room_id: room(room_id),
        level,
    };
    d.handle(conn(id), event)
}

fn phase_of(d: &Dispatcher, room_id: &str) -> RoomPhase {
    d.registry().get(&room(room_id)).unwrap().phase()
}

fn events(out: &[Outbound]) -> Vec<&'static str> {
    out.iter().map(|o| o.event.name()).collect()
}

/// Players in the last `roomUpdate` of `out`.
fn last_update(out: &[Outbound]) -> Vec<readyroom_protocol::PlayerInfo> {
    out.iter()
        .rev()
        .find_map(|o| match &o.event {
            ServerEvent::RoomUpdate(players) => Some(players.clone()),
            _ => None,
        })
        .expect("expected a roomUpdate")
}

/// Joins A(1) and B(2) to R1 and readies both so the game starts.
fn started_room(d: &mut Dispatcher) {
    join(d, 1, "R1", "A");
    join(d, 2, "R1", "B");
    toggle(d, 1, "R1");
    toggle(d, 2, "R1");
    assert!(d.registry().get(&room("R1")).unwrap().is_active());
}

// =========================================================================
// Join
// =========================================================================

#[test]
fn test_joins_are_listed_in_join_order() {
    let mut d = dispatcher_with_quorum(2);
    for (id, name) in [(5, "e"), (1, "a"), (3, "c"), (2, "b")] {
        join(&mut d, id, "R1", name);
    }
    let out = join(&mut d, 4, "R1", "d");

    let players = last_update(&out);
    let ids: Vec<u64> = players.iter().map(|p| p.id).collect();
    assert_eq!(ids, [5, 1, 3, 2, 4]);
    assert!(players.iter().all(|p| !p.ready && p.level == 1));
}

#[test]
fn test_join_broadcasts_to_every_member() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    let out = join(&mut d, 2, "R1", "B");

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].recipient, Recipient::Room(room("R1")));
    assert_eq!(out[0].targets, [conn(1), conn(2)]);
}

#[test]
fn test_rejoin_by_same_connection_does_not_duplicate() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");
    let out = join(&mut d, 1, "R1", "A2");

    let players = last_update(&out);
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].username, "A2");
    assert_eq!(out[0].targets, [conn(1), conn(2)]);
}

#[test]
fn test_rooms_are_isolated() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    let out = join(&mut d, 2, "R2", "B");

    assert_eq!(out[0].targets, [conn(2)]);
    assert_eq!(last_update(&out).len(), 1);
    assert_eq!(d.registry().len(), 2);
}

// =========================================================================
// Ready / start
// =========================================================================

#[test]
fn test_double_toggle_restores_ready() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");

    let out = toggle(&mut d, 1, "R1");
    assert!(last_update(&out)[0].ready);
    let out = toggle(&mut d, 1, "R1");
    assert!(!last_update(&out)[0].ready);
    assert_eq!(events(&out), ["roomUpdate"]);
}

#[test]
fn test_no_start_below_quorum() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    let out = toggle(&mut d, 1, "R1");

    assert_eq!(events(&out), ["roomUpdate"]);
    assert_eq!(phase_of(&d, "R1"), RoomPhase::Lobby);
}

#[test]
fn test_no_start_until_everyone_ready() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");
    join(&mut d, 3, "R1", "C");
    toggle(&mut d, 1, "R1");
    let out = toggle(&mut d, 2, "R1");

    assert_eq!(events(&out), ["roomUpdate"], "C is not ready yet");
    let out = toggle(&mut d, 3, "R1");
    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
}

#[test]
fn test_quorum_of_one_starts_solo_game() {
    let mut d = dispatcher_with_quorum(1);
    join(&mut d, 1, "R1", "A");
    let out = toggle(&mut d, 1, "R1");
    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
}

#[test]
fn test_start_resets_ready_and_level() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");
    level_up(&mut d, 1, "R1", 7.0);
    toggle(&mut d, 1, "R1");
    let out = toggle(&mut d, 2, "R1");

    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
    assert!(out.iter().all(Outbound::is_broadcast));
    for p in last_update(&out) {
        assert!(!p.ready);
        assert_eq!(p.level, 1);
    }
    assert_eq!(phase_of(&d, "R1"), RoomPhase::InGame);
}

// =========================================================================
// Level up
// =========================================================================

#[test]
fn test_level_up_broadcasts_room_update() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    let out = level_up(&mut d, 2, "R1", 4.0);

    assert_eq!(events(&out), ["roomUpdate"]);
    assert_eq!(last_update(&out)[1].level, 4);
}

#[test]
fn test_level_up_unknown_room_is_noop() {
    let mut d = dispatcher_with_quorum(2);
    let out = level_up(&mut d, 1, "none", 4.0);
    assert!(out.is_empty());
    assert!(d.registry().is_empty());
}

#[test]
fn test_win_level_policy() {
    let mut d = dispatcher_with_win_level(3);
    started_room(&mut d);

    let out = level_up(&mut d, 1, "R1", 4.0);
    assert_eq!(events(&out), ["roomUpdate"]);

    let out = level_up(&mut d, 2, "R1", 4.0);
    assert_eq!(events(&out), ["roomUpdate", "gameWin"]);
    assert_eq!(out[1].targets, [conn(1), conn(2)]);
    assert!(!d.registry().contains(&room("R1")));
}

#[test]
fn test_win_level_ignored_in_lobby() {
    let mut d = dispatcher_with_win_level(3);
    join(&mut d, 1, "R1", "A");

    let out = level_up(&mut d, 1, "R1", 9.0);
    assert_eq!(events(&out), ["roomUpdate"]);
    assert!(d.registry().contains(&room("R1")));
}

// =========================================================================
// Finish / win
// =========================================================================

#[test]
fn test_waiting_for_others_goes_only_to_finisher() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    let out = finish(&mut d, 1, "R1");

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].event, ServerEvent::WaitingForOthers);
    assert_eq!(out[0].recipient, Recipient::Connection(conn(1)));
    assert_eq!(out[0].targets, [conn(1)]);
    assert!(!out[0].is_broadcast());
}

#[test]
fn test_duplicate_finish_is_not_double_counted() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");
    let out = finish(&mut d, 1, "R1");

    assert_eq!(events(&out), ["waitingForOthers"]);
    assert!(d.registry().contains(&room("R1")));
}

#[test]
fn test_finish_from_outsider_is_noop() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");
    let out = finish(&mut d, 9, "R1");

    assert!(out.is_empty());
    assert!(d.registry().contains(&room("R1")));
}

#[test]
fn test_all_finished_wins_exactly_once_and_deletes_room() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");
    let out = finish(&mut d, 2, "R1");

    assert_eq!(events(&out), ["gameWin"]);
    assert_eq!(out[0].recipient, Recipient::Room(room("R1")));
    assert_eq!(out[0].targets, [conn(1), conn(2)]);
    assert!(!d.registry().contains(&room("R1")));
    assert!(d.groups().members(&room("R1")).is_empty());

    // Late events for the deleted room are silent.
    assert!(finish(&mut d, 1, "R1").is_empty());
    assert!(d.handle(conn(2), ClientEvent::Mistake(room("R1"))).is_empty());
}

#[test]
fn test_join_after_win_creates_fresh_room() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");
    finish(&mut d, 2, "R1");

    let out = join(&mut d, 3, "R1", "C");
    assert_eq!(out[0].targets, [conn(3)], "old members are not subscribed");
    let room = d.registry().get(&room("R1")).unwrap();
    assert_eq!(room.players().len(), 1);
    assert!(!room.is_active());
    assert!(room.finished().is_empty());
}

#[test]
fn test_finish_marks_reset_when_next_game_starts() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");
    d.handle(conn(2), ClientEvent::Mistake(room("R1")));

    // Ready flags were cleared by the first start, so one toggle each
    // starts the next game.
    toggle(&mut d, 1, "R1");
    let out = toggle(&mut d, 2, "R1");
    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
    assert!(d.registry().get(&room("R1")).unwrap().finished().is_empty());

    let out = finish(&mut d, 2, "R1");
    assert_eq!(events(&out), ["waitingForOthers"]);
}

// =========================================================================
// Mistake
// =========================================================================

#[test]
fn test_mistake_returns_room_to_lobby() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    let out = d.handle(conn(1), ClientEvent::Mistake(room("R1")));

    assert_eq!(events(&out), ["restartGame"]);
    assert_eq!(out[0].targets, [conn(1), conn(2)]);
    assert_eq!(phase_of(&d, "R1"), RoomPhase::Lobby);
}

#[test]
fn test_mistake_on_missing_room_is_noop() {
    let mut d = dispatcher_with_quorum(2);
    let out = d.handle(conn(1), ClientEvent::Mistake(room("ghost")));
    assert!(out.is_empty());
}

// =========================================================================
// Disconnect
// =========================================================================

#[test]
fn test_disconnect_removes_player_and_broadcasts() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");

    let out = d.disconnect(conn(1));

    assert_eq!(events(&out), ["roomUpdate"]);
    assert_eq!(out[0].targets, [conn(2)]);
    let players = last_update(&out);
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].id, 2);
}

#[test]
fn test_disconnect_of_last_player_deletes_room() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");

    let out = d.disconnect(conn(1));

    assert!(out.is_empty());
    assert!(d.registry().is_empty());
}

#[test]
fn test_disconnect_unblocks_quorum_of_ghosts() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");
    join(&mut d, 3, "R1", "C");
    toggle(&mut d, 1, "R1");
    toggle(&mut d, 2, "R1");
    d.disconnect(conn(3));

    // The departed player no longer blocks the start condition.
    toggle(&mut d, 2, "R1");
    let out = toggle(&mut d, 2, "R1");
    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
}

#[test]
fn test_disconnect_completes_win_when_others_finished() {
    let mut d = dispatcher_with_quorum(2);
    started_room(&mut d);
    finish(&mut d, 1, "R1");

    let out = d.disconnect(conn(2));

    assert_eq!(events(&out), ["roomUpdate", "gameWin"]);
    assert_eq!(out[1].targets, [conn(1)]);
    assert!(!d.registry().contains(&room("R1")));
}

#[test]
fn test_disconnect_completes_win_in_lobby_like_finish_does() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");

    let out = finish(&mut d, 1, "R1");
    assert_eq!(events(&out), ["waitingForOthers"]);
    assert_eq!(phase_of(&d, "R1"), RoomPhase::Lobby);

    let out = d.disconnect(conn(2));

    assert_eq!(events(&out), ["roomUpdate", "gameWin"]);
    assert_eq!(out[1].targets, [conn(1)]);
    assert!(!d.registry().contains(&room("R1")));
}

#[test]
fn test_disconnect_without_finishers_does_not_win() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    join(&mut d, 2, "R1", "B");
    finish(&mut d, 2, "R1");

    let out = d.disconnect(conn(2));

    assert_eq!(events(&out), ["roomUpdate"]);
    assert!(d.registry().contains(&room("R1")));
}

#[test]
fn test_disconnect_of_stranger_is_noop() {
    let mut d = dispatcher_with_quorum(2);
    join(&mut d, 1, "R1", "A");
    assert!(d.disconnect(conn(9)).is_empty());
    assert_eq!(d.registry().get(&room("R1")).unwrap().players().len(), 1);
}

// =========================================================================
// End-to-end scenario
// =========================================================================

#[test]
fn test_two_player_session_from_join_to_win() {
    let mut d = dispatcher_with_quorum(2);

    join(&mut d, 1, "R1", "A");
    let out = join(&mut d, 2, "R1", "B");
    assert_eq!(last_update(&out).len(), 2);

    toggle(&mut d, 1, "R1");
    let out = toggle(&mut d, 2, "R1");
    assert_eq!(events(&out), ["gameStart", "roomUpdate"]);
    assert!(last_update(&out).iter().all(|p| !p.ready && p.level == 1));

    let out = finish(&mut d, 1, "R1");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].event, ServerEvent::WaitingForOthers);
    assert_eq!(out[0].targets, [conn(1)]);

    let out = finish(&mut d, 2, "R1");
    assert_eq!(events(&out), ["gameWin"]);
    assert_eq!(out[0].targets, [conn(1), conn(2)]);
    assert!(d.registry().get(&room("R1")).is_none());
}
