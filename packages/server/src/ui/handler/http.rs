//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{infrastructure::dto::http::RegistrySnapshotDto, ui::state::AppState};

/// Debug endpoint listing live sockets (for testing purposes)
pub async fn debug_registry(State(state): State<Arc<AppState>>) -> Json<RegistrySnapshotDto> {
    let snapshot = state.inspect_registry_usecase.execute().await;
    Json(snapshot.into())
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
