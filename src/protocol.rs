use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinLobby {
        #[serde(alias = "display_name")]
        nickname: String,
    },
    /// Host starts a round; without a mode the lobby selection applies
    StartGame {
        #[serde(default)]
        mode: Option<GameMode>,
    },
    /// Speech on the current speaker's turn
    GameChat {
        message: String,
    },
    VoteSubmit {
        target_id: ParticipantId,
    },
    LiarGuess {
        word: String,
    },
    /// Free chat, not bound to turns
    ChatMessage {
        message: String,
    },
    ConfirmRole,
    // Host-only messages
    SetMode {
        mode: GameMode,
    },
    ReturnToLobby,
    SyncGameState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a join
    PlayerInfo {
        id: ParticipantId,
        nickname: String,
        is_host: bool,
    },
    LobbyUpdate {
        players: Vec<ParticipantSummary>,
        mode: GameMode,
    },
    HostChanged {
        host_id: ParticipantId,
        nickname: String,
    },
    ModeUpdate {
        mode: GameMode,
    },
    /// Private role reveal, one per seat
    GameStart {
        role_info: RoleInfo,
        turn_order: Vec<TurnEntry>,
        mode: GameMode,
        spy_mode: bool,
        /// RFC 3339 end of the reveal window
        #[serde(skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
    GameUpdate {
        phase: Phase,
        turn_order: Vec<TurnEntry>,
        current_turn: usize,
        messages: Vec<Speech>,
        category: String,
        voting_started: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
    VoteStart {
        turn_order: Vec<TurnEntry>,
        #[serde(skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
    /// voter -> target
    VoteUpdate {
        votes: BTreeMap<ParticipantId, ParticipantId>,
    },
    LiarCaught {
        liar_id: ParticipantId,
        nickname: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
    GameResult(RoundResult),
    ReturnToLobby {
        players: Vec<ParticipantSummary>,
        mode: GameMode,
    },
    ChatMessage {
        player_id: ParticipantId,
        nickname: String,
        message: String,
    },
    /// Full view of the room for one participant
    GameState {
        phase: Phase,
        mode: GameMode,
        players: Vec<ParticipantSummary>,
        turn_order: Vec<TurnEntry>,
        current_turn: usize,
        messages: Vec<Speech>,
        votes: BTreeMap<ParticipantId, ParticipantId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        role_info: Option<RoleInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<RoundResult>,
    },
    GameError {
        code: String,
        message: String,
    },
}
