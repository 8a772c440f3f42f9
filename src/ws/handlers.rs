//! WebSocket message dispatch
//!
//! Every client message for a room ends up here, inside the room actor.
//! Results land in the machine's outbox; refused actions are answered with a
//! targeted `game_error` unless they merely lost a race with a phase change.

use crate::error::GameResult;
use crate::protocol::ClientMessage;
use crate::state::RoundStateMachine;

/// Apply one client message from `from`
pub fn handle_message(machine: &mut RoundStateMachine, from: &str, msg: ClientMessage) {
    let action = action_name(&msg);
    if let Err(err) = dispatch(machine, from, msg) {
        if err.is_silent() {
            tracing::debug!("Dropped {} from {}: {}", action, from, err);
        } else {
            tracing::warn!("Rejected {} from {}: {}", action, from, err);
            machine.reject(from, &err);
        }
    }
}

fn dispatch(machine: &mut RoundStateMachine, from: &str, msg: ClientMessage) -> GameResult<()> {
    match msg {
        ClientMessage::JoinLobby { nickname } => machine.join(from, &nickname),
        ClientMessage::StartGame { mode } => machine.start_round(from, mode),
        ClientMessage::GameChat { message } => machine.submit_speech(from, &message),
        ClientMessage::VoteSubmit { target_id } => machine.submit_vote(from, &target_id),
        ClientMessage::LiarGuess { word } => machine.submit_guess(from, &word),
        ClientMessage::ChatMessage { message } => machine.chat(from, &message),
        ClientMessage::ConfirmRole => machine.confirm_role(from),

        // Host-only commands (authorization checked by the machine)
        ClientMessage::SetMode { mode } => machine.set_mode(from, mode),
        ClientMessage::ReturnToLobby => machine.return_to_lobby(from),

        ClientMessage::SyncGameState => machine.sync(from),
    }
}

fn action_name(msg: &ClientMessage) -> &'static str {
    match msg {
        ClientMessage::JoinLobby { .. } => "join_lobby",
        ClientMessage::StartGame { .. } => "start_game",
        ClientMessage::GameChat { .. } => "game_chat",
        ClientMessage::VoteSubmit { .. } => "vote_submit",
        ClientMessage::LiarGuess { .. } => "liar_guess",
        ClientMessage::ChatMessage { .. } => "chat_message",
        ClientMessage::ConfirmRole => "confirm_role",
        ClientMessage::SetMode { .. } => "set_mode",
        ClientMessage::ReturnToLobby => "return_to_lobby",
        ClientMessage::SyncGameState => "sync_game_state",
    }
}
