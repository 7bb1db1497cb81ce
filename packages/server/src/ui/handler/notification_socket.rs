//! Notification socket endpoint (`/ws-notify?token=...`).

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
    domain::{Identity, open_connection},
    ui::state::AppState,
    usecase::ForwardExit,
};

use super::session::{SessionGuard, SessionTarget, pusher_loop};

/// Query parameters for a notification socket
#[derive(Debug, Deserialize)]
pub struct NotificationSocketQuery {
    pub token: Option<String>,
}

pub async fn notification_socket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationSocketQuery>,
) -> Response {
    let identity = match state
        .authorize_connection_usecase
        .authorize_user(query.token.as_deref())
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "notification socket rejected");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let user_id = identity.user_id;
    ws.on_failed_upgrade(move |e| {
        tracing::warn!(user_id = %user_id, error = %e, "notification socket upgrade failed");
    })
    .on_upgrade(move |socket| handle_notification_socket(socket, state, identity))
}

async fn handle_notification_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let user_id = identity.user_id;
    let (connection, outbox) = open_connection(state.config.outbound_buffer);
    let connection_id = connection.id();
    state
        .connect_session_usecase
        .attach_notifications(user_id, connection.clone())
        .await;
    let mut guard = SessionGuard::new(
        state.disconnect_session_usecase.clone(),
        SessionTarget::Notifications {
            user_id,
            connection_id,
        },
    );

    let (sender, mut receiver) = socket.split();

    // Inbound frames carry nothing; the read loop only notices the disconnect
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    let forward_usecase = state.forward_notifications_usecase.clone();
    let mut forward_task =
        tokio::spawn(async move { forward_usecase.execute(user_id, connection).await });

    let mut send_task = pusher_loop(outbox, sender, state.config.write_timeout);
    guard.track(&recv_task);
    guard.track(&forward_task);
    guard.track(&send_task);

    tokio::select! {
        _ = &mut recv_task => {},
        _ = &mut send_task => {},
        exit = &mut forward_task => {
            if let Ok(exit) = exit {
                tracing::info!(user_id = %user_id, exit = ?exit, "notification forwarding stopped");
                if exit != ForwardExit::SocketClosed {
                    // let the writer deliver the close frame
                    let _ = tokio::time::timeout(state.config.write_timeout, &mut send_task).await;
                }
            }
        },
    };

    guard.release().await;
}
