//! Room socket endpoint (`/ws?token=...&room=...`).

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures_util::stream::StreamExt;
use serde::Deserialize;

use crate::{
    domain::{Identity, MessageContent, RoomId, open_connection},
    ui::state::AppState,
};

use super::session::{SessionGuard, SessionTarget, pusher_loop, supervise};

/// Query parameters for a room socket
#[derive(Debug, Deserialize)]
pub struct RoomSocketQuery {
    pub token: Option<String>,
    pub room: Option<String>,
}

/// Authorize, then upgrade. Every rejection is answered with a status code
/// before any socket exists.
pub async fn room_socket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomSocketQuery>,
) -> Response {
    let (identity, room_id) = match state
        .authorize_connection_usecase
        .authorize_room(query.token.as_deref(), query.room.as_deref())
        .await
    {
        Ok(authorized) => authorized,
        Err(e) => {
            tracing::warn!(room = ?query.room, error = %e, "room socket rejected");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let user_id = identity.user_id;
    ws.on_failed_upgrade(move |e| {
        tracing::warn!(room_id = %room_id, user_id = %user_id, error = %e, "room socket upgrade failed");
    })
    .on_upgrade(move |socket| handle_room_socket(socket, state, identity, room_id))
}

async fn handle_room_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    identity: Identity,
    room_id: RoomId,
) {
    let (connection, outbox) = open_connection(state.config.outbound_buffer);
    let connection_id = connection.id();
    state
        .connect_session_usecase
        .join_room(room_id, &identity, connection)
        .await;
    let guard = SessionGuard::new(
        state.disconnect_session_usecase.clone(),
        SessionTarget::Room {
            room_id,
            connection_id,
        },
    );

    let (sender, mut receiver) = socket.split();

    // Inbound frames are handled one at a time, in arrival order
    let state_clone = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "room socket read failed");
                    break;
                }
            };

            let text = match msg {
                Message::Text(text) => text.as_str().to_string(),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::warn!(connection_id = %connection_id, "skipping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => {
                    tracing::info!(connection_id = %connection_id, "client requested close");
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            let content = match MessageContent::new(text) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "skipping inbound frame");
                    continue;
                }
            };

            state_clone
                .send_message_usecase
                .execute(room_id, &identity, content)
                .await;
        }
    });

    let send_task = pusher_loop(outbox, sender, state.config.write_timeout);
    supervise(guard, recv_task, send_task).await;
}
