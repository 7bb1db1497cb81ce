//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::CloseReason;

use super::{
    handler::{debug_registry, health_check, notification_socket_handler, room_socket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat relay
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(room_socket_handler))
            .route("/ws-notify", get(notification_socket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/debug/registry", get(debug_registry))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the relay until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        tracing::info!("Room sockets: ws://{}/ws?token=...&room=...", bind_addr);
        tracing::info!("Notification sockets: ws://{}/ws-notify?token=...", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// 既にバインド済みのリスナーで、`shutdown` が完了するまでサーバーを動かす
    ///
    /// `shutdown` の完了後、登録中の全ソケットに
    /// [`CloseReason::ServerShutdown`] で close を要求する。アップグレード済みの
    /// ソケットは axum の graceful shutdown の対象外なので、Close フレームが送られて
    /// Registry が空になるまで (最大 `write_timeout`) 待ってから戻る。
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let state = self.state;
        let shutdown_state = state.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                shutdown_state
                    .disconnect_session_usecase
                    .close_all(CloseReason::ServerShutdown)
                    .await;
            })
            .await;

        drain_sessions(&state).await;
        served
    }
}

/// Registry が空になるまで待つ (最大 `write_timeout`)
async fn drain_sessions(state: &AppState) {
    let drained = tokio::time::timeout(state.config.write_timeout, async {
        while !state.inspect_registry_usecase.execute().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    match drained {
        Ok(()) => tracing::debug!("all sessions closed"),
        Err(_) => tracing::warn!(
            timeout = ?state.config.write_timeout,
            "sessions still open after shutdown"
        ),
    }
}
