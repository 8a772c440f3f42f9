pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::RoomEvent;

const DEFAULT_ROOM: &str = "lobby";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: Option<String>,
    /// Id of an earlier connection to re-attach to
    pub session: Option<String>,
}

impl WsQuery {
    fn room_name(&self) -> String {
        self.room
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROOM)
            .to_string()
    }

    fn session_id(&self) -> String {
        self.session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ulid::Ulid::new().to_string())
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={:?}, session={:?}",
        params.room,
        params.session
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let room_name = params.room_name();
    let id = params.session_id();
    let conn = state.next_connection();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let room = state.connect(&room_name, &id, conn, tx).await;
    tracing::info!("Connection #{} for {} joined room {}", conn, id, room_name);

    loop {
        tokio::select! {
            // Messages from the room
            room_msg = rx.recv() => {
                let Some(msg) = room_msg else {
                    // Replaced by a newer connection, or the room shut down
                    break;
                };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => {
                                let event = RoomEvent::Message { from: id.clone(), msg };
                                if !room.send(event) {
                                    tracing::error!("Room {} is gone", room_name);
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = ServerMessage::GameError {
                                    code: "PARSE_ERROR".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    room.send(RoomEvent::Disconnect { id: id.clone(), conn });
    tracing::info!("Connection #{} for {} closed", conn, id);
}
