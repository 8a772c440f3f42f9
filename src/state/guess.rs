use super::{RoundStateMachine, TimerKind};
use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::words::normalize_word;

/// Case and whitespace never matter when the liar names the word
pub fn guess_matches(guess: &str, secret: &str) -> bool {
    let guess = normalize_word(guess);
    !guess.is_empty() && guess == normalize_word(secret)
}

impl RoundStateMachine {
    pub(super) fn begin_exposure(&mut self) {
        self.enter_phase(Phase::ExposureGuess);
        self.arm_phase_timer(TimerKind::Guess);

        let Some(round) = self.round.as_ref() else {
            return;
        };
        let liar = round.seat_info(&round.camouflage);
        tracing::info!("Round {}: liar {} caught", round.number, liar.id);
        let msg = ServerMessage::LiarCaught {
            liar_id: liar.id,
            nickname: liar.nickname,
            deadline: self.deadline(),
        };
        self.broadcast(msg);
    }

    /// The exposed liar's last chance. Guesses from anybody else are dropped.
    pub fn submit_guess(&mut self, id: &str, word: &str) -> GameResult<()> {
        self.require_registered(id)?;
        self.expect_phase(Phase::ExposureGuess)?;
        let Some(round) = self.round.as_ref() else {
            return Ok(());
        };
        if round.camouflage != id {
            tracing::debug!("Ignoring guess from {}", id);
            return Ok(());
        }

        if guess_matches(word, &round.secret) {
            self.finalize_round(Side::Camouflage, "The liar guessed the word!");
        } else {
            self.finalize_round(Side::Regular, "The liar failed to guess the word.");
        }
        Ok(())
    }
}
