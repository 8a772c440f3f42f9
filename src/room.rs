//! Room actor.
//!
//! One tokio task per room owns the room's [`RoundStateMachine`] and feeds it
//! events strictly one at a time from an unbounded queue. After each event it
//! drains the machine's outbox: messages fan out to connection channels and
//! timers become sleeping tasks that post [`RoomEvent::TimerFired`] back.

use crate::config::GameConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{Outgoing, RoundStateMachine, TimerSlot, TimerToken};
use crate::types::{ParticipantId, RoomId};
use crate::words::WordSource;
use crate::ws::handlers;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub type ConnectionSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
pub enum RoomEvent {
    /// A socket opened for `id`; `conn` is its serial number
    Connect {
        id: ParticipantId,
        conn: u64,
        sender: ConnectionSender,
    },
    Message {
        from: ParticipantId,
        msg: ClientMessage,
    },
    Disconnect {
        id: ParticipantId,
        conn: u64,
    },
    TimerFired(TimerToken),
}

/// Cheap handle for posting events to a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: RoomId,
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false once the room has shut down
    pub fn send(&self, event: RoomEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Connection {
    conn: u64,
    sender: ConnectionSender,
}

struct Room {
    name: RoomId,
    machine: RoundStateMachine,
    connections: HashMap<ParticipantId, Connection>,
    /// Pending sleep per slot, tagged with its token generation
    timers: HashMap<TimerSlot, (u64, AbortHandle)>,
    events: mpsc::UnboundedSender<RoomEvent>,
}

/// Start a room with a fresh machine
pub fn spawn_room(name: &str, config: GameConfig, words: Arc<dyn WordSource>) -> RoomHandle {
    spawn_room_with(name, RoundStateMachine::new(config, words))
}

/// Start a room around an existing machine
pub fn spawn_room_with(name: &str, machine: RoundStateMachine) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let room = Room {
        name: name.to_string(),
        machine,
        connections: HashMap::new(),
        timers: HashMap::new(),
        events: tx.clone(),
    };
    tokio::spawn(room.run(rx));
    tracing::info!("Room {} opened", name);

    RoomHandle {
        name: name.to_string(),
        tx,
    }
}

impl Room {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
            self.flush();

            if self.connections.is_empty() && self.machine.is_deserted() {
                break;
            }
        }

        for (_, (_, timer)) in self.timers.drain() {
            timer.abort();
        }
        tracing::info!("Room {} closed", self.name);
    }

    fn handle(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connect { id, conn, sender } => {
                tracing::debug!("Room {}: connection #{} for {}", self.name, conn, id);
                self.connections
                    .insert(id.clone(), Connection { conn, sender });
                self.machine.reconnect(&id);
            }
            RoomEvent::Message { from, msg } => {
                handlers::handle_message(&mut self.machine, &from, msg);
            }
            RoomEvent::Disconnect { id, conn } => {
                // A newer socket may already have replaced this one
                if self.connections.get(&id).is_some_and(|c| c.conn == conn) {
                    self.connections.remove(&id);
                    self.machine.disconnect(&id);
                }
            }
            RoomEvent::TimerFired(token) => {
                if self
                    .timers
                    .get(&token.slot)
                    .is_some_and(|(generation, _)| *generation == token.generation)
                {
                    self.timers.remove(&token.slot);
                }
                self.machine.on_timer(&token);
            }
        }
    }

    fn flush(&mut self) {
        for effect in self.machine.drain() {
            match effect {
                Outgoing::Broadcast(msg) => {
                    for connection in self.connections.values() {
                        let _ = connection.sender.send(msg.clone());
                    }
                }
                Outgoing::Direct { to, msg } => {
                    if let Some(connection) = self.connections.get(&to) {
                        let _ = connection.sender.send(msg);
                    }
                }
                Outgoing::Schedule { token, after } => {
                    let slot = token.slot.clone();
                    let generation = token.generation;
                    let events = self.events.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = events.send(RoomEvent::TimerFired(token));
                    });
                    if let Some((_, previous)) =
                        self.timers.insert(slot, (generation, task.abort_handle()))
                    {
                        previous.abort();
                    }
                }
                Outgoing::Cancel(slot) => {
                    if let Some((_, timer)) = self.timers.remove(&slot) {
                        timer.abort();
                    }
                }
            }
        }
    }
}
