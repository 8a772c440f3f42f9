//! Armed timers.
//!
//! A phase owns at most one armed timer, stored on the round. Each arm mints
//! a fresh generation, so a firing is acted on only if its token still equals
//! the armed one and the round is still in the phase the timer was armed for.

use super::{Outgoing, RoundStateMachine};
use crate::types::{ParticipantId, Phase, Side};
use chrono::{DateTime, Utc};
use std::time::Duration;

const GUESS_TIMEOUT: &str = "The liar ran out of time to guess the word.";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// The running round's phase timer
    Phase,
    /// Reconnection window of a dropped participant
    Grace(ParticipantId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    RoleReveal,
    Turn,
    Voting,
    Guess,
    Cooldown,
    Grace,
}

impl TimerKind {
    /// Phase a phase timer guards
    fn guards(self) -> Option<Phase> {
        match self {
            TimerKind::RoleReveal => Some(Phase::RoleReveal),
            TimerKind::Turn => Some(Phase::Speaking),
            TimerKind::Voting => Some(Phase::Voting),
            TimerKind::Guess => Some(Phase::ExposureGuess),
            TimerKind::Cooldown => Some(Phase::Result),
            TimerKind::Grace => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerToken {
    pub slot: TimerSlot,
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArmedTimer {
    pub token: TimerToken,
    pub deadline: DateTime<Utc>,
}

impl RoundStateMachine {
    fn next_token(&mut self, slot: TimerSlot, kind: TimerKind) -> TimerToken {
        self.timer_generation += 1;
        TimerToken {
            slot,
            kind,
            generation: self.timer_generation,
        }
    }

    fn duration_of(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::RoleReveal => self.config.role_reveal,
            TimerKind::Turn => self.config.turn,
            TimerKind::Voting => self.config.voting,
            TimerKind::Guess => self.config.guess,
            TimerKind::Cooldown => self.config.result_cooldown,
            TimerKind::Grace => self.config.disconnect_grace,
        }
    }

    /// Arm (or re-arm) the phase timer; the previous one is superseded
    pub(super) fn arm_phase_timer(&mut self, kind: TimerKind) {
        if self.round.is_none() {
            return;
        }
        let after = self.duration_of(kind);
        let token = self.next_token(TimerSlot::Phase, kind);
        let deadline = Utc::now()
            + chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());

        if let Some(round) = self.round.as_mut() {
            round.timer = Some(ArmedTimer {
                token: token.clone(),
                deadline,
            });
        }
        self.outbox.push(Outgoing::Schedule { token, after });
    }

    pub(super) fn disarm_phase_timer(&mut self) {
        if let Some(round) = self.round.as_mut() {
            if round.timer.take().is_some() {
                self.outbox.push(Outgoing::Cancel(TimerSlot::Phase));
            }
        }
    }

    /// The one place a round changes phase; the old phase's timer dies here
    pub(super) fn enter_phase(&mut self, phase: Phase) {
        self.disarm_phase_timer();
        if let Some(round) = self.round.as_mut() {
            tracing::info!(
                "Round {}: {:?} -> {:?}",
                round.number,
                round.phase,
                phase
            );
            round.phase = phase;
        }
    }

    pub(super) fn arm_grace_timer(&mut self, id: &str) {
        let slot = TimerSlot::Grace(id.to_string());
        let token = self.next_token(slot, TimerKind::Grace);
        self.grace_timers.insert(id.to_string(), token.clone());
        self.outbox.push(Outgoing::Schedule {
            token,
            after: self.config.disconnect_grace,
        });
    }

    pub(super) fn disarm_grace_timer(&mut self, id: &str) {
        if self.grace_timers.remove(id).is_some() {
            self.outbox
                .push(Outgoing::Cancel(TimerSlot::Grace(id.to_string())));
        }
    }

    /// Handle a timer firing; stale or mismatched tokens are ignored
    pub fn on_timer(&mut self, token: &TimerToken) {
        match &token.slot {
            TimerSlot::Phase => {
                let armed = self
                    .round
                    .as_ref()
                    .and_then(|r| r.timer.as_ref())
                    .is_some_and(|t| t.token == *token);
                if !armed {
                    tracing::debug!("Ignoring stale timer {:?}", token);
                    return;
                }
                if token.kind.guards() != Some(self.phase()) {
                    tracing::debug!(
                        "Timer {:?} no longer matches phase {:?}",
                        token.kind,
                        self.phase()
                    );
                    return;
                }
                if let Some(round) = self.round.as_mut() {
                    round.timer = None;
                }

                match token.kind {
                    TimerKind::RoleReveal => self.begin_speaking(),
                    TimerKind::Turn => self.skip_turn(),
                    TimerKind::Voting => self.end_voting(),
                    TimerKind::Guess => {
                        self.finalize_round(Side::Regular, GUESS_TIMEOUT);
                    }
                    TimerKind::Cooldown => {
                        self.reset_to_idle();
                    }
                    TimerKind::Grace => {}
                }
            }
            TimerSlot::Grace(id) => {
                if self.grace_timers.get(id) != Some(token) {
                    tracing::debug!("Ignoring stale grace timer for {}", id);
                    return;
                }
                self.grace_timers.remove(id);
                tracing::info!("Grace window expired for {}", id);
                self.remove_participant(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::GameConfig;
    use crate::types::GameMode;

    fn phase_token(m: &RoundStateMachine) -> TimerToken {
        m.round().unwrap().timer.as_ref().unwrap().token.clone()
    }

    #[test]
    fn test_start_arms_role_reveal_timer() {
        let mut m = lobby(3, 1);
        m.start_round("p0", None).unwrap();
        let out = m.drain();

        let scheduled: Vec<_> = out
            .iter()
            .filter_map(|o| match o {
                Outgoing::Schedule { token, after } => Some((token.kind, *after)),
                _ => None,
            })
            .collect();
        assert_eq!(
            scheduled,
            vec![(TimerKind::RoleReveal, GameConfig::default().role_reveal)]
        );
    }

    #[test]
    fn test_role_reveal_timer_starts_speaking() {
        let mut m = started(4, GameMode::Basic, 2);
        let token = phase_token(&m);
        m.on_timer(&token);
        assert_eq!(m.phase(), Phase::Speaking);
        assert_eq!(phase_token(&m).kind, TimerKind::Turn);
    }

    #[test]
    fn test_stale_timer_is_noop() {
        let mut m = started(4, GameMode::Basic, 2);
        let reveal = phase_token(&m);
        m.confirm_role("p0").unwrap();
        assert_eq!(m.phase(), Phase::Speaking);
        m.drain();

        // Reveal timer fires after the host already advanced
        m.on_timer(&reveal);
        assert_eq!(m.phase(), Phase::Speaking);
        assert!(m.round().unwrap().speeches.is_empty());
        assert!(m.drain().is_empty());
    }

    #[test]
    fn test_leaving_phase_cancels_timer() {
        let mut m = started(4, GameMode::Basic, 2);
        m.confirm_role("p0").unwrap();
        let out = m.drain();
        assert!(out.contains(&Outgoing::Cancel(TimerSlot::Phase)));
    }

    #[test]
    fn test_turn_timer_inserts_placeholder() {
        let mut m = speaking(4, GameMode::Basic, 3);
        let speaker = m.round().unwrap().current_speaker().unwrap().clone();
        let token = phase_token(&m);

        m.on_timer(&token);
        let round = m.round().unwrap();
        assert_eq!(round.speeches.len(), 1);
        assert_eq!(round.speeches[0].player_id, speaker);
        assert!(round.speeches[0].timed_out);
        assert_eq!(round.current_turn, 1);
        // Fresh timer for the next speaker
        assert_ne!(phase_token(&m), token);
    }

    #[test]
    fn test_turn_timers_drive_round_into_voting() {
        let mut m = speaking(3, GameMode::Basic, 4);
        for _ in 0..3 {
            let token = phase_token(&m);
            m.on_timer(&token);
        }
        assert_eq!(m.phase(), Phase::Voting);
        assert_eq!(phase_token(&m).kind, TimerKind::Voting);
    }

    #[test]
    fn test_guess_timer_expiry_regular_side_wins() {
        let mut m = voting(3, GameMode::Basic, 5);
        let liar = camouflage(&m);
        for id in ids(3) {
            m.submit_vote(&id, &liar).unwrap();
        }
        assert_eq!(m.phase(), Phase::ExposureGuess);
        let token = phase_token(&m);
        m.on_timer(&token);

        assert_eq!(m.phase(), Phase::Result);
        let outcome = m.round().unwrap().outcome.as_ref().unwrap();
        assert_eq!(outcome.winner, Side::Regular);
    }

    #[test]
    fn test_cooldown_timer_returns_to_idle() {
        let mut m = voting(3, GameMode::Basic, 6);
        m.end_voting();
        assert_eq!(m.phase(), Phase::Result);
        let token = phase_token(&m);
        assert_eq!(token.kind, TimerKind::Cooldown);

        m.on_timer(&token);
        assert_eq!(m.phase(), Phase::Idle);
        // Firing again is harmless
        m.on_timer(&token);
        assert_eq!(m.phase(), Phase::Idle);
    }
}
