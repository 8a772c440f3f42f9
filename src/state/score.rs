use super::{RoundStateMachine, TimerKind};
use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::types::*;

const LIAR_WIN_POINTS: u32 = 3;
const SPY_WIN_POINTS: u32 = 1;
const PLAYER_WIN_POINTS: u32 = 1;

/// Points each seat earns for a round won by `winner`
pub fn score_deltas(
    winner: Side,
    camouflage: &str,
    accomplice: Option<&str>,
    turn_order: &[ParticipantId],
) -> Vec<(ParticipantId, u32)> {
    match winner {
        Side::Camouflage => {
            let mut deltas = vec![(camouflage.to_string(), LIAR_WIN_POINTS)];
            if let Some(spy) = accomplice {
                deltas.push((spy.to_string(), SPY_WIN_POINTS));
            }
            deltas
        }
        Side::Regular => turn_order
            .iter()
            .filter(|id| id.as_str() != camouflage && Some(id.as_str()) != accomplice)
            .map(|id| (id.clone(), PLAYER_WIN_POINTS))
            .collect(),
    }
}

impl RoundStateMachine {
    /// Close the round: score it, publish the result and start the cooldown.
    ///
    /// Returns false if the round was already closed, in which case nothing
    /// changes.
    pub(super) fn finalize_round(&mut self, winner: Side, message: &str) -> bool {
        let Some(round) = self.round.as_ref() else {
            return false;
        };
        if round.phase == Phase::Result {
            return false;
        }

        let deltas = score_deltas(
            winner,
            &round.camouflage,
            round.accomplice.as_deref(),
            &round.turn_order,
        );
        for (id, points) in deltas {
            if let Some(participant) = self.registry.get_mut(&id) {
                participant.score += points;
            }
        }

        self.enter_phase(Phase::Result);
        let Some(round) = self.round.as_ref() else {
            return false;
        };
        let result = RoundResult {
            winner,
            message: message.to_string(),
            liar: round.seat_info(&round.camouflage),
            spy: round.accomplice.as_deref().map(|id| round.seat_info(id)),
            category: round.category.clone(),
            word: round.secret.clone(),
            decoy_word: round.decoy.clone(),
            scores: self.registry.scores(),
        };
        tracing::info!(
            "Round {} over, {:?} wins: {}",
            round.number,
            winner,
            message
        );

        if let Some(round) = self.round.as_mut() {
            round.outcome = Some(result.clone());
        }
        self.arm_phase_timer(TimerKind::Cooldown);
        self.broadcast(ServerMessage::GameResult(result));
        true
    }

    /// Leave the result screen. Returns false unless a result was showing.
    pub(super) fn reset_to_idle(&mut self) -> bool {
        if self.phase() != Phase::Result {
            return false;
        }
        self.disarm_phase_timer();
        self.round = None;
        for participant in self.registry.iter_mut() {
            participant.role = None;
            participant.confirmed = false;
            participant.is_spectator = false;
        }
        tracing::info!("Back to the lobby");

        let msg = ServerMessage::ReturnToLobby {
            players: self.registry.list(),
            mode: self.mode,
        };
        self.broadcast(msg);
        true
    }

    /// Host skips the rest of the result cooldown
    pub fn return_to_lobby(&mut self, requester: &str) -> GameResult<()> {
        self.require_host(requester)?;
        self.expect_phase(Phase::Result)?;
        self.reset_to_idle();
        Ok(())
    }
}
