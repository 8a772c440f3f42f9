use super::{RoundStateMachine, TimerKind};
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Stand-in utterance when a speaker lets their turn run out
const TIMEOUT_PLACEHOLDER: &str = "...";

impl RoundStateMachine {
    /// The current speaker gives their hint
    pub fn submit_speech(&mut self, id: &str, text: &str) -> GameResult<()> {
        self.require_registered(id)?;
        self.expect_phase(Phase::Speaking)?;
        let is_current = self
            .round
            .as_ref()
            .and_then(|r| r.current_speaker())
            .is_some_and(|speaker| speaker == id);
        if !is_current {
            return Err(GameError::NotYourTurn);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyMessage);
        }
        let message: String = text.chars().take(self.config.max_speech_chars).collect();
        self.record_speech(id, message, false);
        Ok(())
    }

    /// Turn timer ran out for the current speaker
    pub(super) fn skip_turn(&mut self) {
        let Some(speaker) = self
            .round
            .as_ref()
            .and_then(|r| r.current_speaker())
            .cloned()
        else {
            return;
        };
        tracing::info!("{} ran out of time to speak", speaker);
        self.record_speech(&speaker, TIMEOUT_PLACEHOLDER.to_string(), true);
    }

    fn record_speech(&mut self, id: &str, message: String, timed_out: bool) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let nickname = round.seat_name(id);
        round.speeches.push(Speech {
            player_id: id.to_string(),
            nickname,
            message,
            timed_out,
        });
        round.current_turn = (round.current_turn + 1) % round.turn_order.len().max(1);
        self.advance_speaking(true);
    }

    /// Move to voting once every seat has spoken, otherwise keep the turn
    /// going. `new_speaker` re-arms the turn timer.
    pub(super) fn advance_speaking(&mut self, new_speaker: bool) {
        if self.round.as_ref().is_some_and(|r| r.everyone_spoke()) {
            self.begin_voting();
            return;
        }
        if new_speaker {
            self.arm_phase_timer(TimerKind::Turn);
        }
        self.broadcast_game_update();
    }
}
