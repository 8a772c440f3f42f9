//! Round state machine for one room.
//!
//! Every inbound action and timer firing goes through a `&mut self` method,
//! one at a time. Nothing here blocks or awaits: each method mutates state and
//! queues [`Outgoing`] effects which the room actor drains and delivers.

mod guess;
mod participant;
mod round;
mod score;
mod speech;
mod timer;
mod vote;

pub use guess::guess_matches;
pub use round::Round;
pub use score::score_deltas;
pub use timer::{ArmedTimer, TimerKind, TimerSlot, TimerToken};
pub use vote::{tally_votes, VoteTally};

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::registry::Registry;
use crate::types::*;
use crate::words::WordSource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Side effect requested by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Deliver to every connection in the room
    Broadcast(ServerMessage),
    /// Deliver to a single participant
    Direct { to: ParticipantId, msg: ServerMessage },
    /// Fire `token` back into the machine after `after`
    Schedule { token: TimerToken, after: Duration },
    /// Drop whatever is pending in `slot`
    Cancel(TimerSlot),
}

pub struct RoundStateMachine {
    config: GameConfig,
    words: Arc<dyn WordSource>,
    rng: StdRng,
    registry: Registry,
    /// Mode preselected in the lobby
    mode: GameMode,
    /// `None` while idle
    round: Option<Round>,
    rounds_played: u32,
    timer_generation: u64,
    grace_timers: HashMap<ParticipantId, TimerToken>,
    outbox: Vec<Outgoing>,
}

impl RoundStateMachine {
    pub fn new(config: GameConfig, words: Arc<dyn WordSource>) -> Self {
        Self::with_rng(config, words, StdRng::from_os_rng())
    }

    /// Deterministic construction for tests and replays
    pub fn with_rng(config: GameConfig, words: Arc<dyn WordSource>, rng: StdRng) -> Self {
        Self {
            config,
            words,
            rng,
            registry: Registry::new(),
            mode: GameMode::default(),
            round: None,
            rounds_played: 0,
            timer_generation: 0,
            grace_timers: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.round.as_ref().map_or(Phase::Idle, |r| r.phase)
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// Nobody is left to play or to come back
    pub fn is_deserted(&self) -> bool {
        self.registry.is_empty()
    }

    /// Take every effect queued since the last drain
    pub fn drain(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    /// Tell one participant their action was refused
    pub fn reject(&mut self, to: &str, err: &GameError) {
        self.send(
            to,
            ServerMessage::GameError {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        );
    }

    fn broadcast(&mut self, msg: ServerMessage) {
        self.outbox.push(Outgoing::Broadcast(msg));
    }

    fn send(&mut self, to: &str, msg: ServerMessage) {
        self.outbox.push(Outgoing::Direct {
            to: to.to_string(),
            msg,
        });
    }

    fn expect_phase(&self, expected: Phase) -> GameResult<()> {
        let actual = self.phase();
        if actual != expected {
            return Err(GameError::WrongPhase { expected, actual });
        }
        Ok(())
    }

    fn require_registered(&self, id: &str) -> GameResult<()> {
        if !self.registry.contains(id) {
            return Err(GameError::UnknownParticipant);
        }
        Ok(())
    }

    fn require_host(&self, id: &str) -> GameResult<()> {
        self.require_registered(id)?;
        if !self.registry.is_host(id) {
            return Err(GameError::NotHost);
        }
        Ok(())
    }

    fn lobby_update(&self) -> ServerMessage {
        ServerMessage::LobbyUpdate {
            players: self.registry.list(),
            mode: self.mode,
        }
    }

    fn deadline(&self) -> Option<String> {
        self.round
            .as_ref()
            .and_then(|r| r.timer.as_ref())
            .map(|t| t.deadline.to_rfc3339())
    }

    /// Public snapshot of the running round
    fn game_update(&self) -> Option<ServerMessage> {
        let round = self.round.as_ref()?;
        Some(ServerMessage::GameUpdate {
            phase: round.phase,
            turn_order: round.turn_entries(),
            current_turn: round.current_turn,
            messages: round.speeches.clone(),
            category: round.category.clone(),
            voting_started: matches!(round.phase, Phase::Voting | Phase::ExposureGuess),
            deadline: self.deadline(),
        })
    }

    fn broadcast_game_update(&mut self) {
        if let Some(update) = self.game_update() {
            self.broadcast(update);
        }
    }

    /// Everything a (re)connecting participant needs to render the room
    pub fn game_state_for(&self, id: &str) -> ServerMessage {
        let round = self.round.as_ref();
        ServerMessage::GameState {
            phase: self.phase(),
            mode: round.map_or(self.mode, |r| r.mode),
            players: self.registry.list(),
            turn_order: round.map(|r| r.turn_entries()).unwrap_or_default(),
            current_turn: round.map_or(0, |r| r.current_turn),
            messages: round.map(|r| r.speeches.clone()).unwrap_or_default(),
            votes: round.map(|r| r.vote_map()).unwrap_or_default(),
            deadline: self.deadline(),
            role_info: round.and_then(|r| r.role_info(id)),
            result: round.and_then(|r| r.outcome.clone()),
        }
    }
}
