use super::{RoundStateMachine, TimerKind};
use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;

/// Outcome of counting the ballots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    /// Votes per seated target, in turn order
    pub counts: Vec<(ParticipantId, u32)>,
    /// First seat holding the highest count
    pub leader: Option<ParticipantId>,
    pub top: u32,
    pub tied: bool,
    /// Votes needed to expose somebody
    pub majority: u32,
}

impl VoteTally {
    /// The participant the room agreed on, if any
    pub fn exposed(&self) -> Option<&ParticipantId> {
        if self.tied || self.top == 0 || self.top < self.majority {
            return None;
        }
        self.leader.as_ref()
    }
}

/// Count `votes` against the seats in `turn_order`.
///
/// Majority is half the seats rounded up. Ballots naming somebody who is no
/// longer seated do not count.
pub fn tally_votes(
    votes: &HashMap<ParticipantId, ParticipantId>,
    turn_order: &[ParticipantId],
) -> VoteTally {
    let counts: Vec<(ParticipantId, u32)> = turn_order
        .iter()
        .map(|seat| {
            let n = votes.values().filter(|target| *target == seat).count() as u32;
            (seat.clone(), n)
        })
        .collect();

    let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|(_, n)| top > 0 && *n == top);
    let leader = leaders.next().map(|(id, _)| id.clone());
    let tied = leaders.next().is_some();

    VoteTally {
        counts,
        leader,
        top,
        tied,
        majority: turn_order.len().div_ceil(2) as u32,
    }
}

impl RoundStateMachine {
    pub(super) fn begin_voting(&mut self) {
        self.enter_phase(Phase::Voting);
        if let Some(round) = self.round.as_mut() {
            round.votes.clear();
        }
        self.arm_phase_timer(TimerKind::Voting);

        let Some(round) = self.round.as_ref() else {
            return;
        };
        let msg = ServerMessage::VoteStart {
            turn_order: round.turn_entries(),
            deadline: self.deadline(),
        };
        self.broadcast(msg);
    }

    /// Record or replace a ballot. Ballots from or for anyone outside the
    /// turn order are dropped.
    pub fn submit_vote(&mut self, voter: &str, target: &str) -> GameResult<()> {
        self.require_registered(voter)?;
        self.expect_phase(Phase::Voting)?;
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        if !round.is_seated(voter) || !round.is_seated(target) {
            tracing::debug!("Ignoring vote {} -> {}", voter, target);
            return Ok(());
        }
        round
            .votes
            .insert(voter.to_string(), target.to_string());
        tracing::debug!("{} voted for {}", voter, target);

        if round.everyone_voted() {
            self.end_voting();
        } else {
            let votes = round.vote_map();
            self.broadcast(ServerMessage::VoteUpdate { votes });
        }
        Ok(())
    }

    /// Tally the ballots and resolve the vote
    pub fn end_voting(&mut self) {
        if self.phase() != Phase::Voting {
            return;
        }
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let tally = tally_votes(&round.votes, &round.turn_order);
        tracing::info!(
            "Round {} tally: top={} majority={} tied={}",
            round.number,
            tally.top,
            tally.majority,
            tally.tied
        );

        let camouflage = round.camouflage.clone();
        let accomplice = round.accomplice.clone();
        match tally.exposed() {
            None => {
                self.finalize_round(Side::Camouflage, "The liar escaped the accusation!");
            }
            Some(id) if *id == camouflage => self.begin_exposure(),
            Some(id) if accomplice.as_ref() == Some(id) => {
                self.finalize_round(Side::Regular, "The spy was exposed!");
            }
            Some(_) => {
                self.finalize_round(Side::Camouflage, "The liar successfully disguised!");
            }
        }
    }
}
