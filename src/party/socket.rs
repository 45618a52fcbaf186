use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::AppState;

use super::protocol::{ClientMessage, ServerMessage};
use super::registry::RoomRegistry;

/// WebSocket upgrade for `/party/{room_id}`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state.rooms))
}

/// One connection: a pump task drains the outbound channel into the socket
/// while this loop processes inbound frames in arrival order. The sender is
/// bound to a participant id by its `presence.join`; until then cursor
/// frames are dropped.
async fn handle_socket(socket: WebSocket, room_id: String, rooms: RoomRegistry) {
    let conn_id = Uuid::new_v4();
    tracing::debug!(room = %room_id, conn = %conn_id, "presence connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Snapshot first, before any other frame can reach this connection.
    let _ = tx.send(ServerMessage::Sync {
        users: rooms.snapshot(&room_id),
    });

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize outbound frame: {e}");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut bound_user: Option<String> = None;

    while let Some(result) = ws_rx.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(room = %room_id, "websocket error: {e}");
                break;
            }
        };

        let msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(room = %room_id, "dropping malformed frame: {e}");
                continue;
            }
        };

        match msg {
            ClientMessage::Join { user } => {
                bound_user = Some(user.user_id.clone());
                rooms.join(&room_id, user, conn_id, tx.clone());
            }
            ClientMessage::CursorMove { cursor } => {
                if let Some(user_id) = &bound_user {
                    rooms.move_cursor(&room_id, user_id, cursor);
                }
            }
            ClientMessage::Event { event } => {
                rooms.relay_event(&room_id, event);
            }
        }
    }

    // No broadcast if this connection never joined.
    if let Some(user_id) = bound_user {
        rooms.leave(&room_id, &user_id, conn_id);
    }
    send_task.abort();
    tracing::debug!(room = %room_id, conn = %conn_id, "presence connection closed");
}
