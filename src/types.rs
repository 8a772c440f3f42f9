use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ParticipantId = String;
pub type RoomId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    RoleReveal,
    Speaking,
    Voting,
    ExposureGuess,
    Result,
}

/// Round variant chosen by the host.
///
/// Wire names follow the lobby buttons: `basic`, `spy` and `fool`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GameMode {
    #[default]
    #[serde(rename = "basic")]
    Basic,
    /// An accomplice who knows the word secretly sides with the liar
    #[serde(rename = "spy", alias = "accomplice")]
    Accomplice,
    /// The liar is handed a different word and is never told
    #[serde(rename = "fool", alias = "mismatch")]
    Mismatch,
}

/// Per-round role as seen by the participant holding it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "liar")]
    Camouflage,
    #[serde(rename = "spy")]
    Accomplice,
    #[serde(rename = "player")]
    Regular,
}

/// Winning side of a round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    #[serde(rename = "liar")]
    Camouflage,
    #[serde(rename = "players")]
    Regular,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
    /// Lifetime score within this room
    pub score: u32,
    pub is_host: bool,
    /// Joined while a round was running; sits out until the next lobby
    pub is_spectator: bool,
    /// Actual role for the current round (never the mismatch disguise)
    pub role: Option<Role>,
    /// Acknowledged the private role reveal this round
    pub confirmed: bool,
    /// False while inside the reconnection grace window
    pub connected: bool,
    #[serde(skip)]
    pub(crate) joined_seq: u64,
}

/// One utterance in the speaking phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Speech {
    pub player_id: ParticipantId,
    pub nickname: String,
    pub message: String,
    /// Placeholder inserted when the speaker's turn timer ran out
    #[serde(default)]
    pub timed_out: bool,
}

/// Lobby roster entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub nickname: String,
    pub is_spectator: bool,
    pub is_host: bool,
    pub connected: bool,
}

impl From<&Participant> for ParticipantSummary {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id.clone(),
            nickname: p.nickname.clone(),
            is_spectator: p.is_spectator,
            is_host: p.is_host,
            connected: p.connected,
        }
    }
}

/// Turn order entry with the current speaker highlighted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnEntry {
    pub id: ParticipantId,
    pub nickname: String,
    pub is_turn: bool,
}

/// Identity of a seat revealed in a result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatInfo {
    pub id: ParticipantId,
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub id: ParticipantId,
    pub nickname: String,
    pub score: u32,
}

/// Private round information sent to one seated participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleInfo {
    pub role: Role,
    pub category: String,
    pub word: Option<String>,
}

/// Final outcome of a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub winner: Side,
    pub message: String,
    pub liar: SeatInfo,
    pub spy: Option<SeatInfo>,
    pub category: String,
    pub word: String,
    /// Word the liar was handed in mismatch mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoy_word: Option<String>,
    pub scores: Vec<ScoreEntry>,
}
