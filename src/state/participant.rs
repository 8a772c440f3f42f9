use super::RoundStateMachine;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::registry::sanitize_name;
use crate::types::*;

impl RoundStateMachine {
    /// Join the room, or re-attach after a dropped connection.
    ///
    /// Anyone arriving while a round runs watches as a spectator until the
    /// room is back in the lobby.
    pub fn join(&mut self, id: &str, raw_nickname: &str) -> GameResult<()> {
        let nickname = sanitize_name(raw_nickname, self.config.max_name_chars)?;
        let spectator = self.phase() != Phase::Idle;
        let registration = self.registry.register(id, nickname, spectator);
        self.disarm_grace_timer(id);

        let participant = registration.participant;
        if registration.created {
            tracing::info!(
                "{} joined as {} (host: {}, spectator: {})",
                id,
                participant.nickname,
                participant.is_host,
                participant.is_spectator
            );
        } else {
            tracing::info!("{} rejoined as {}", id, participant.nickname);
        }

        self.send(
            id,
            ServerMessage::PlayerInfo {
                id: participant.id.clone(),
                nickname: participant.nickname.clone(),
                is_host: participant.is_host,
            },
        );
        let update = self.lobby_update();
        self.broadcast(update);
        if self.round.is_some() {
            let state = self.game_state_for(id);
            self.send(id, state);
        }
        Ok(())
    }

    /// A known session opened a new connection; re-attach it under the name
    /// it already has. Returns false for unknown ids.
    pub fn reconnect(&mut self, id: &str) -> bool {
        let Some(nickname) = self.registry.nickname(id).map(str::to_string) else {
            return false;
        };
        self.join(id, &nickname).is_ok()
    }

    /// Connection dropped. Without a grace window the participant leaves at
    /// once, otherwise they stay registered until the window closes.
    pub fn disconnect(&mut self, id: &str) {
        if self.config.disconnect_grace.is_zero() {
            self.remove_participant(id);
            return;
        }
        let Some(participant) = self.registry.get_mut(id) else {
            return;
        };
        participant.connected = false;
        tracing::info!("{} disconnected, holding their seat", id);
        self.arm_grace_timer(id);
        let update = self.lobby_update();
        self.broadcast(update);
    }

    /// Drop a participant for good. Safe to call more than once.
    pub fn remove_participant(&mut self, id: &str) {
        self.disarm_grace_timer(id);
        let Some(departure) = self.registry.unregister(id) else {
            return;
        };
        tracing::info!("{} ({}) left", id, departure.participant.nickname);

        self.handle_seat_loss(id);

        let update = self.lobby_update();
        self.broadcast(update);
        if let Some(host) = departure.new_host {
            tracing::info!("{} is now host", host.id);
            self.broadcast(ServerMessage::HostChanged {
                host_id: host.id,
                nickname: host.nickname,
            });
        }
    }

    fn handle_seat_loss(&mut self, id: &str) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        if round.phase == Phase::Result {
            return;
        }

        if round.camouflage == id {
            self.finalize_round(Side::Regular, "The liar left the game.");
            return;
        }
        if round.accomplice.as_deref() == Some(id) {
            self.finalize_round(Side::Regular, "The spy left the game.");
            return;
        }

        let was_current = round.current_speaker().is_some_and(|s| s == id);
        if !round.remove_seat(id) {
            return;
        }
        if round.turn_order.len() < self.config.min_players {
            self.finalize_round(Side::Regular, "Not enough players left to continue.");
            return;
        }

        let phase = round.phase;
        let everyone_voted = round.everyone_voted();
        match phase {
            Phase::RoleReveal => {
                if self.confirmation_quorum_reached() {
                    self.begin_speaking();
                } else {
                    self.broadcast_game_update();
                }
            }
            Phase::Speaking => self.advance_speaking(was_current),
            Phase::Voting => {
                if everyone_voted {
                    self.end_voting();
                } else {
                    self.broadcast_game_update();
                }
            }
            _ => self.broadcast_game_update(),
        }
    }

    /// Free chat, open in every phase
    pub fn chat(&mut self, id: &str, text: &str) -> GameResult<()> {
        let nickname = self
            .registry
            .nickname(id)
            .ok_or(GameError::UnknownParticipant)?
            .to_string();
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyMessage);
        }
        let message: String = text.chars().take(self.config.max_chat_chars).collect();
        self.broadcast(ServerMessage::ChatMessage {
            player_id: id.to_string(),
            nickname,
            message,
        });
        Ok(())
    }

    /// Host preselects the mode for the next round
    pub fn set_mode(&mut self, requester: &str, mode: GameMode) -> GameResult<()> {
        self.require_host(requester)?;
        self.expect_phase(Phase::Idle)?;
        self.mode = mode;
        tracing::info!("Mode set to {:?}", mode);
        self.broadcast(ServerMessage::ModeUpdate { mode });
        Ok(())
    }

    /// Resend the full room snapshot to one participant
    pub fn sync(&mut self, id: &str) -> GameResult<()> {
        self.require_registered(id)?;
        let state = self.game_state_for(id);
        self.send(id, state);
        Ok(())
    }
}
