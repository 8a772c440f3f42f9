use liar_game::config::GameConfig;
use liar_game::protocol::{ClientMessage, ServerMessage};
use liar_game::room::{spawn_room_with, RoomEvent, RoomHandle};
use liar_game::state::{Outgoing, RoundStateMachine};
use liar_game::types::{GameMode, Phase, Role, Side};
use liar_game::words::WordBank;
use liar_game::ws::handlers::handle_message;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn machine(config: GameConfig, seed: u64) -> RoundStateMachine {
    let words = WordBank::builtin().expect("Built-in word bank should load");
    RoundStateMachine::with_rng(config, Arc::new(words), StdRng::seed_from_u64(seed))
}

fn send(m: &mut RoundStateMachine, from: &str, msg: ClientMessage) -> Vec<Outgoing> {
    handle_message(m, from, msg);
    m.drain()
}

fn join(m: &mut RoundStateMachine, id: &str, nickname: &str) {
    send(
        m,
        id,
        ClientMessage::JoinLobby {
            nickname: nickname.to_string(),
        },
    );
}

fn current_speaker(m: &RoundStateMachine) -> String {
    m.round()
        .and_then(|r| r.current_speaker())
        .cloned()
        .expect("Someone should hold the turn")
}

/// End-to-end integration test for a complete round
#[test]
fn test_full_round_liar_guesses_word() {
    let mut m = machine(GameConfig::default(), 7);
    let players = ["alice", "bob", "carol", "dave"];
    for id in players {
        join(&mut m, id, id);
    }
    assert!(m.registry().is_host("alice"));

    // 1. Host starts; every seat gets a private reveal
    let out = send(
        &mut m,
        "alice",
        ClientMessage::StartGame {
            mode: Some(GameMode::Basic),
        },
    );
    assert_eq!(m.phase(), Phase::RoleReveal);
    let mut liars = 0;
    for id in players {
        let reveal = out.iter().find_map(|o| match o {
            Outgoing::Direct {
                to,
                msg: ServerMessage::GameStart { role_info, .. },
            } if to == id => Some(role_info.clone()),
            _ => None,
        });
        let reveal = reveal.expect("Every seat should get a reveal");
        if reveal.role == Role::Camouflage {
            liars += 1;
            assert!(reveal.word.is_none());
        } else {
            assert!(reveal.word.is_some());
        }
    }
    assert_eq!(liars, 1);

    // 2. Initiator confirms, speaking begins
    send(&mut m, "alice", ClientMessage::ConfirmRole);
    assert_eq!(m.phase(), Phase::Speaking);

    // 3. Everybody speaks once, in turn order
    for _ in 0..players.len() {
        let speaker = current_speaker(&m);
        send(
            &mut m,
            &speaker,
            ClientMessage::GameChat {
                message: format!("hint from {}", speaker),
            },
        );
    }
    assert_eq!(m.phase(), Phase::Voting);

    // 4. Unanimous vote against the liar
    let liar = m.round().unwrap().camouflage.clone();
    for id in players {
        send(
            &mut m,
            id,
            ClientMessage::VoteSubmit {
                target_id: liar.clone(),
            },
        );
    }
    assert_eq!(m.phase(), Phase::ExposureGuess);

    // 5. Liar names the word
    let secret = m.round().unwrap().secret.clone();
    let out = send(
        &mut m,
        &liar,
        ClientMessage::LiarGuess {
            word: secret.to_lowercase(),
        },
    );
    assert_eq!(m.phase(), Phase::Result);
    let result = out
        .iter()
        .find_map(|o| match o {
            Outgoing::Broadcast(ServerMessage::GameResult(result)) => Some(result.clone()),
            _ => None,
        })
        .expect("Result should be broadcast");
    assert_eq!(result.winner, Side::Camouflage);
    assert_eq!(result.liar.id, liar);
    assert_eq!(result.word, secret);
    let liar_score = result.scores.iter().find(|s| s.id == liar).unwrap().score;
    assert_eq!(liar_score, 3);

    // 6. Host returns everybody to the lobby
    let out = send(&mut m, "alice", ClientMessage::ReturnToLobby);
    assert_eq!(m.phase(), Phase::Idle);
    assert!(out
        .iter()
        .any(|o| matches!(o, Outgoing::Broadcast(ServerMessage::ReturnToLobby { .. }))));
}

#[test]
fn test_rejections_reach_only_sender() {
    let mut m = machine(GameConfig::default(), 3);
    for id in ["a", "b", "c"] {
        join(&mut m, id, id);
    }
    send(&mut m, "a", ClientMessage::StartGame { mode: None });
    send(&mut m, "a", ClientMessage::ConfirmRole);

    let speaker = current_speaker(&m);
    let other = ["a", "b", "c"]
        .into_iter()
        .find(|id| *id != speaker)
        .unwrap();
    let out = send(
        &mut m,
        other,
        ClientMessage::GameChat {
            message: "me first".to_string(),
        },
    );
    assert_eq!(out.len(), 1);
    assert!(matches!(
        &out[0],
        Outgoing::Direct { to, msg: ServerMessage::GameError { code, .. } }
            if to == other && code == "NOT_YOUR_TURN"
    ));
    assert!(m.round().unwrap().speeches.is_empty());
}

#[test]
fn test_spectator_joins_next_round() {
    let mut m = machine(GameConfig::default(), 11);
    for id in ["a", "b", "c"] {
        join(&mut m, id, id);
    }
    send(&mut m, "a", ClientMessage::StartGame { mode: None });
    join(&mut m, "late", "late");
    assert!(m.registry().get("late").unwrap().is_spectator);
    assert!(!m.round().unwrap().is_seated("late"));

    // Nobody votes; the liar escapes when voting is closed
    send(&mut m, "a", ClientMessage::ConfirmRole);
    for _ in 0..3 {
        let speaker = current_speaker(&m);
        send(
            &mut m,
            &speaker,
            ClientMessage::GameChat {
                message: "hmm".to_string(),
            },
        );
    }
    m.end_voting();
    assert_eq!(m.phase(), Phase::Result);
    send(&mut m, "a", ClientMessage::ReturnToLobby);

    send(&mut m, "a", ClientMessage::StartGame { mode: None });
    let round = m.round().unwrap();
    assert_eq!(round.number, 2);
    assert_eq!(round.turn_order.len(), 4);
    assert!(round.is_seated("late"));
}

#[test]
fn test_liar_disconnect_mid_round() {
    let mut m = machine(GameConfig::default(), 5);
    for id in ["a", "b", "c", "d"] {
        join(&mut m, id, id);
    }
    send(&mut m, "a", ClientMessage::StartGame { mode: None });
    let liar = m.round().unwrap().camouflage.clone();

    m.disconnect(&liar);
    let out = m.drain();
    assert_eq!(m.phase(), Phase::Result);
    let results: Vec<_> = out
        .iter()
        .filter_map(|o| match o {
            Outgoing::Broadcast(ServerMessage::GameResult(result)) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].winner, Side::Regular);
    assert_eq!(results[0].liar.id, liar);
}

// Room actor

fn fast_config() -> GameConfig {
    GameConfig {
        role_reveal: Duration::from_millis(20),
        turn: Duration::from_millis(20),
        voting: Duration::from_millis(20),
        guess: Duration::from_millis(20),
        result_cooldown: Duration::from_millis(20),
        ..GameConfig::default()
    }
}

fn connect(room: &RoomHandle, id: &str, conn: u64) -> mpsc::UnboundedReceiver<ServerMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    assert!(room.send(RoomEvent::Connect {
        id: id.to_string(),
        conn,
        sender: tx,
    }));
    rx
}

fn post(room: &RoomHandle, from: &str, msg: ClientMessage) {
    assert!(room.send(RoomEvent::Message {
        from: from.to_string(),
        msg,
    }));
}

/// Read messages until one matches, failing after a generous timeout
async fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<ServerMessage>, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(msg) if pred(&msg) => return msg,
                Some(_) => continue,
                None => panic!("Connection closed while waiting"),
            }
        }
    })
    .await
    .expect("Timed out waiting for message")
}

#[tokio::test]
async fn test_timers_drive_round_back_to_lobby() {
    let room = spawn_room_with("timers", machine(fast_config(), 9));
    let mut inboxes = Vec::new();
    for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
        inboxes.push(connect(&room, id, i as u64));
        post(
            &room,
            id,
            ClientMessage::JoinLobby {
                nickname: id.to_uppercase(),
            },
        );
    }
    post(&room, "a", ClientMessage::StartGame { mode: None });

    let host = &mut inboxes[0];
    wait_for(host, |m| matches!(m, ServerMessage::GameStart { .. })).await;
    wait_for(host, |m| {
        matches!(m, ServerMessage::GameUpdate { phase: Phase::Speaking, .. })
    })
    .await;
    wait_for(host, |m| matches!(m, ServerMessage::VoteStart { .. })).await;

    // No speeches and no votes: every turn times out and the liar escapes
    let result = wait_for(host, |m| matches!(m, ServerMessage::GameResult(_))).await;
    match result {
        ServerMessage::GameResult(result) => assert_eq!(result.winner, Side::Camouflage),
        other => panic!("Expected GameResult, got {:?}", other),
    }
    wait_for(host, |m| matches!(m, ServerMessage::ReturnToLobby { .. })).await;
}

#[tokio::test]
async fn test_timed_out_speeches_are_marked() {
    let room = spawn_room_with("speeches", machine(fast_config(), 2));
    let mut rx = connect(&room, "a", 1);
    for id in ["a", "b", "c"] {
        post(
            &room,
            id,
            ClientMessage::JoinLobby {
                nickname: id.to_string(),
            },
        );
    }
    post(&room, "a", ClientMessage::StartGame { mode: None });

    // The last timeout goes straight to voting, so look at the one before
    let update = wait_for(&mut rx, |m| {
        matches!(m, ServerMessage::GameUpdate { messages, .. } if messages.len() == 2)
    })
    .await;
    match update {
        ServerMessage::GameUpdate { messages, .. } => {
            assert!(messages.iter().all(|s| s.timed_out && s.message == "..."));
        }
        other => panic!("Expected GameUpdate, got {:?}", other),
    }
    wait_for(&mut rx, |m| matches!(m, ServerMessage::VoteStart { .. })).await;
}

#[tokio::test]
async fn test_newer_connection_replaces_older() {
    let room = spawn_room_with("swap", machine(GameConfig::default(), 1));
    let mut old = connect(&room, "a", 1);
    post(
        &room,
        "a",
        ClientMessage::JoinLobby {
            nickname: "Ann".to_string(),
        },
    );
    wait_for(&mut old, |m| matches!(m, ServerMessage::PlayerInfo { .. })).await;

    let mut new = connect(&room, "a", 2);
    // Re-attaching resends the participant's info on the new socket
    let info = wait_for(&mut new, |m| matches!(m, ServerMessage::PlayerInfo { .. })).await;
    assert!(matches!(info, ServerMessage::PlayerInfo { is_host: true, .. }));

    // Old socket's queue is closed once drained
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while old.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok());

    // Stale disconnect from the old socket is ignored
    assert!(room.send(RoomEvent::Disconnect {
        id: "a".to_string(),
        conn: 1,
    }));
    post(&room, "a", ClientMessage::SyncGameState);
    wait_for(&mut new, |m| matches!(m, ServerMessage::GameState { .. })).await;
}
