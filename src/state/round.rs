use super::{RoundStateMachine, TimerKind};
use super::timer::ArmedTimer;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::words;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// Everything about a single round, from role reveal to result
#[derive(Debug, Clone)]
pub struct Round {
    pub number: u32,
    pub mode: GameMode,
    pub phase: Phase,
    pub category: String,
    pub secret: String,
    /// Word handed to the liar in mismatch mode
    pub decoy: Option<String>,
    /// Seated participants in speaking order
    pub turn_order: Vec<ParticipantId>,
    pub current_turn: usize,
    pub speeches: Vec<Speech>,
    /// voter -> target, one entry per voter
    pub votes: HashMap<ParticipantId, ParticipantId>,
    pub camouflage: ParticipantId,
    pub accomplice: Option<ParticipantId>,
    /// Participant who started the round
    pub initiator: ParticipantId,
    /// Nicknames at round start, so results can name people who left
    pub seat_names: HashMap<ParticipantId, String>,
    pub outcome: Option<RoundResult>,
    pub(crate) timer: Option<ArmedTimer>,
}

impl Round {
    pub fn is_seated(&self, id: &str) -> bool {
        self.turn_order.iter().any(|seat| seat == id)
    }

    pub fn current_speaker(&self) -> Option<&ParticipantId> {
        self.turn_order.get(self.current_turn)
    }

    pub fn seat_name(&self, id: &str) -> String {
        self.seat_names.get(id).cloned().unwrap_or_default()
    }

    pub fn seat_info(&self, id: &str) -> SeatInfo {
        SeatInfo {
            id: id.to_string(),
            nickname: self.seat_name(id),
        }
    }

    /// Actual role of a seated participant
    pub fn role_of(&self, id: &str) -> Option<Role> {
        if !self.is_seated(id) && self.camouflage != id {
            return None;
        }
        if self.camouflage == id {
            Some(Role::Camouflage)
        } else if self.accomplice.as_deref() == Some(id) {
            Some(Role::Accomplice)
        } else {
            Some(Role::Regular)
        }
    }

    /// What the participant is told about themselves.
    ///
    /// In mismatch mode the liar sees an ordinary role with the decoy word.
    pub fn role_info(&self, id: &str) -> Option<RoleInfo> {
        let (role, word) = match self.role_of(id)? {
            Role::Camouflage if self.mode == GameMode::Mismatch => {
                (Role::Regular, self.decoy.clone())
            }
            Role::Camouflage => (Role::Camouflage, None),
            role => (role, Some(self.secret.clone())),
        };
        Some(RoleInfo {
            role,
            category: self.category.clone(),
            word,
        })
    }

    pub fn turn_entries(&self) -> Vec<TurnEntry> {
        let current = self.current_speaker();
        self.turn_order
            .iter()
            .map(|id| TurnEntry {
                id: id.clone(),
                nickname: self.seat_name(id),
                is_turn: self.phase == Phase::Speaking && current == Some(id),
            })
            .collect()
    }

    /// Every participant still seated has spoken at least once
    pub fn everyone_spoke(&self) -> bool {
        self.turn_order
            .iter()
            .all(|id| self.speeches.iter().any(|s| &s.player_id == id))
    }

    pub fn everyone_voted(&self) -> bool {
        self.turn_order.iter().all(|id| self.votes.contains_key(id))
    }

    /// Votes in a stable order for the wire
    pub fn vote_map(&self) -> BTreeMap<ParticipantId, ParticipantId> {
        self.votes
            .iter()
            .map(|(voter, target)| (voter.clone(), target.clone()))
            .collect()
    }

    /// Drop a seat and keep `current_turn` pointing at the same speaker, or
    /// wrap it when the removed seat was the last one
    pub fn remove_seat(&mut self, id: &str) -> bool {
        let Some(pos) = self.turn_order.iter().position(|seat| seat == id) else {
            return false;
        };
        self.turn_order.remove(pos);
        if pos < self.current_turn {
            self.current_turn -= 1;
        }
        if self.turn_order.is_empty() {
            self.current_turn = 0;
        } else {
            self.current_turn %= self.turn_order.len();
        }
        true
    }
}

impl RoundStateMachine {
    /// Host starts a round with every non-spectator participant seated
    pub fn start_round(&mut self, requester: &str, mode: Option<GameMode>) -> GameResult<()> {
        self.require_host(requester)?;
        self.expect_phase(Phase::Idle)?;

        let mut turn_order = self.registry.active_ids();
        let count = turn_order.len();
        if count < self.config.min_players || count > self.config.max_players {
            return Err(GameError::InvalidPlayerCount { count });
        }

        let mode = mode.unwrap_or(self.mode);
        let draw = words::draw_secret(self.words.as_ref(), &mut self.rng, mode == GameMode::Mismatch)
            .ok_or(GameError::NoWords)?;
        self.mode = mode;

        turn_order.shuffle(&mut self.rng);
        let camouflage = turn_order[self.rng.random_range(0..count)].clone();
        let accomplice = if mode == GameMode::Accomplice && count > 3 {
            let others: Vec<&ParticipantId> =
                turn_order.iter().filter(|id| **id != camouflage).collect();
            others.choose(&mut self.rng).map(|id| (*id).clone())
        } else {
            None
        };
        let decoy = if mode == GameMode::Mismatch {
            words::draw_decoy(self.words.as_ref(), &mut self.rng, &draw.category, &draw.word)
        } else {
            None
        };

        for participant in self.registry.iter_mut() {
            participant.role = None;
            participant.confirmed = false;
        }
        let mut seat_names = HashMap::new();
        for id in &turn_order {
            if let Some(participant) = self.registry.get_mut(id) {
                participant.role = Some(if *id == camouflage {
                    Role::Camouflage
                } else if accomplice.as_ref() == Some(id) {
                    Role::Accomplice
                } else {
                    Role::Regular
                });
                seat_names.insert(id.clone(), participant.nickname.clone());
            }
        }

        self.rounds_played += 1;
        tracing::info!(
            "Round {} started by {} in {:?} mode with {} players (category: {})",
            self.rounds_played,
            requester,
            mode,
            count,
            draw.category
        );

        self.round = Some(Round {
            number: self.rounds_played,
            mode,
            phase: Phase::RoleReveal,
            category: draw.category,
            secret: draw.word,
            decoy,
            turn_order: turn_order.clone(),
            current_turn: 0,
            speeches: Vec::new(),
            votes: HashMap::new(),
            camouflage,
            accomplice,
            initiator: requester.to_string(),
            seat_names,
            outcome: None,
            timer: None,
        });
        self.arm_phase_timer(TimerKind::RoleReveal);

        let deadline = self.deadline();
        if let Some(round) = self.round.as_ref() {
            let entries = round.turn_entries();
            let reveals: Vec<(ParticipantId, RoleInfo)> = turn_order
                .iter()
                .filter_map(|id| round.role_info(id).map(|info| (id.clone(), info)))
                .collect();
            for (id, role_info) in reveals {
                self.send(
                    &id,
                    ServerMessage::GameStart {
                        role_info,
                        turn_order: entries.clone(),
                        mode,
                        spy_mode: mode == GameMode::Accomplice,
                        deadline: deadline.clone(),
                    },
                );
            }
        }
        self.broadcast_game_update();
        Ok(())
    }

    /// A seated participant acknowledges their private reveal
    pub fn confirm_role(&mut self, id: &str) -> GameResult<()> {
        self.require_registered(id)?;
        self.expect_phase(Phase::RoleReveal)?;
        if !self.round.as_ref().is_some_and(|r| r.is_seated(id)) {
            tracing::debug!("Ignoring confirmation from unseated {}", id);
            return Ok(());
        }

        if let Some(participant) = self.registry.get_mut(id) {
            participant.confirmed = true;
        }
        if self.confirmation_quorum_reached() {
            self.begin_speaking();
        }
        Ok(())
    }

    pub(super) fn confirmation_quorum_reached(&self) -> bool {
        let Some(round) = self.round.as_ref() else {
            return false;
        };
        let confirmed = |id: &str| self.registry.get(id).is_some_and(|p| p.confirmed);

        if self.config.require_all_confirm {
            round.turn_order.iter().all(|id| confirmed(id.as_str()))
        } else {
            confirmed(&round.initiator)
        }
    }

    pub(super) fn begin_speaking(&mut self) {
        if self.phase() != Phase::RoleReveal {
            return;
        }
        self.enter_phase(Phase::Speaking);
        if let Some(round) = self.round.as_mut() {
            round.current_turn = 0;
        }
        self.arm_phase_timer(TimerKind::Turn);
        self.broadcast_game_update();
    }
}
