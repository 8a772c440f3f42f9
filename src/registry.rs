//! Participant registry: who is in the room, who hosts it, and lifetime scores.

use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashMap;

/// Outcome of [`Registry::register`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub participant: Participant,
    /// False when an existing entry was re-attached
    pub created: bool,
}

/// Outcome of [`Registry::unregister`]
#[derive(Debug, Clone)]
pub struct Departure {
    pub participant: Participant,
    /// Set when the host left and the flag moved to someone else
    pub new_host: Option<Participant>,
}

#[derive(Debug, Default)]
pub struct Registry {
    participants: HashMap<ParticipantId, Participant>,
    next_seq: u64,
}

/// Trim, drop control characters and cap the length of a display name
pub fn sanitize_name(raw: &str, max_chars: usize) -> GameResult<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(max_chars)
        .collect();
    let cleaned = cleaned.trim_end().to_string();

    if cleaned.is_empty() {
        return Err(GameError::InvalidName);
    }
    Ok(cleaned)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a participant or re-attach an existing one.
    ///
    /// Re-registering a known id updates the name in place and marks the
    /// participant connected again; `spectator` only applies to new entries.
    pub fn register(&mut self, id: &str, nickname: String, spectator: bool) -> Registration {
        if let Some(existing) = self.participants.get_mut(id) {
            existing.nickname = nickname;
            existing.connected = true;
            return Registration {
                participant: existing.clone(),
                created: false,
            };
        }

        let participant = Participant {
            id: id.to_string(),
            nickname,
            score: 0,
            is_host: self.participants.is_empty(),
            is_spectator: spectator,
            role: None,
            confirmed: false,
            connected: true,
            joined_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.participants.insert(id.to_string(), participant.clone());

        Registration {
            participant,
            created: true,
        }
    }

    /// Remove a participant, handing the host flag to the longest-present
    /// remaining participant when needed
    pub fn unregister(&mut self, id: &str) -> Option<Departure> {
        let participant = self.participants.remove(id)?;

        let new_host = if participant.is_host {
            let successor = self
                .participants
                .values_mut()
                .min_by_key(|p| p.joined_seq);
            successor.map(|p| {
                p.is_host = true;
                p.clone()
            })
        } else {
            None
        };

        Some(Departure {
            participant,
            new_host,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.values().find(|p| p.is_host)
    }

    pub fn is_host(&self, id: &str) -> bool {
        self.get(id).is_some_and(|p| p.is_host)
    }

    pub fn nickname(&self, id: &str) -> Option<&str> {
        self.get(id).map(|p| p.nickname.as_str())
    }

    /// Participants in join order
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        let mut all: Vec<&Participant> = self.participants.values().collect();
        all.sort_by_key(|p| p.joined_seq);
        all.into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    /// Roster for rendering, in join order
    pub fn list(&self) -> Vec<ParticipantSummary> {
        self.iter().map(ParticipantSummary::from).collect()
    }

    /// Ids of everyone eligible for the next round, in join order
    pub fn active_ids(&self) -> Vec<ParticipantId> {
        self.iter()
            .filter(|p| !p.is_spectator)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Scores of non-spectators, in join order
    pub fn scores(&self) -> Vec<ScoreEntry> {
        self.iter()
            .filter(|p| !p.is_spectator)
            .map(|p| ScoreEntry {
                id: p.id.clone(),
                nickname: p.nickname.clone(),
                score: p.score,
            })
            .collect()
    }
}
