use crate::config::GameConfig;
use crate::room::{spawn_room, ConnectionSender, RoomEvent, RoomHandle};
use crate::types::{ParticipantId, RoomId};
use crate::words::WordSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared server state: the directory of running rooms
pub struct AppState {
    pub config: GameConfig,
    pub words: Arc<dyn WordSource>,
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
    next_conn: AtomicU64,
}

impl AppState {
    pub fn new(config: GameConfig, words: Arc<dyn WordSource>) -> Self {
        Self {
            config,
            words,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            next_conn: AtomicU64::new(1),
        }
    }

    /// Serial number for a new socket
    pub fn next_connection(&self) -> u64 {
        self.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    /// Attach a connection to `room`, opening the room if it is not running.
    ///
    /// A room that shut down between lookup and attach is replaced.
    pub async fn connect(
        &self,
        room: &str,
        id: &ParticipantId,
        conn: u64,
        sender: ConnectionSender,
    ) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, handle| !handle.is_closed());

        if let Some(handle) = rooms.get(room) {
            let event = RoomEvent::Connect {
                id: id.clone(),
                conn,
                sender: sender.clone(),
            };
            if handle.send(event) {
                return handle.clone();
            }
            tracing::debug!("Room {} closed while connecting, reopening", room);
        }

        let handle = spawn_room(room, self.config.clone(), self.words.clone());
        // A fresh actor only exits after handling at least one event
        handle.send(RoomEvent::Connect {
            id: id.clone(),
            conn,
            sender,
        });
        rooms.insert(room.to_string(), handle.clone());
        handle
    }

    /// Names of the rooms still running
    pub async fn room_names(&self) -> Vec<RoomId> {
        let rooms = self.rooms.read().await;
        let mut names: Vec<RoomId> = rooms
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientMessage, ServerMessage};
    use crate::words::WordBank;
    use tokio::sync::mpsc;

    fn app() -> AppState {
        AppState::new(GameConfig::default(), Arc::new(WordBank::builtin().unwrap()))
    }

    #[tokio::test]
    async fn test_connection_serials_increase() {
        let state = app();
        let a = state.next_connection();
        let b = state.next_connection();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_rooms_are_separate() {
        let state = app();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let a = state.connect("one", &"a".to_string(), 1, tx_a).await;
        let b = state.connect("two", &"b".to_string(), 2, tx_b).await;
        assert_eq!(a.name(), "one");
        assert_eq!(state.room_names().await, vec!["one", "two"]);

        a.send(RoomEvent::Message {
            from: "a".to_string(),
            msg: ClientMessage::JoinLobby {
                nickname: "Ann".to_string(),
            },
        });
        b.send(RoomEvent::Message {
            from: "b".to_string(),
            msg: ClientMessage::JoinLobby {
                nickname: "Ben".to_string(),
            },
        });

        // Each participant hosts their own room
        match rx_a.recv().await {
            Some(ServerMessage::PlayerInfo { is_host, .. }) => assert!(is_host),
            other => panic!("Expected PlayerInfo, got {:?}", other),
        }
        match rx_b.recv().await {
            Some(ServerMessage::PlayerInfo { is_host, .. }) => assert!(is_host),
            other => panic!("Expected PlayerInfo, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_room_closes_and_reopens() {
        let state = app();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = state.connect("lobby", &"a".to_string(), 1, tx).await;
        handle.send(RoomEvent::Disconnect {
            id: "a".to_string(),
            conn: 1,
        });

        for _ in 0..100 {
            if handle.is_closed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(handle.is_closed());
        assert!(state.room_names().await.is_empty());

        let (tx, _rx) = mpsc::unbounded_channel();
        let reopened = state.connect("lobby", &"b".to_string(), 2, tx).await;
        assert!(!reopened.is_closed());
    }
}
