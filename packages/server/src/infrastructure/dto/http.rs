//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConnectionsDto {
    pub room_id: String,
    pub connections: usize,
}

/// `GET /debug/registry` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshotDto {
    pub rooms: Vec<RoomConnectionsDto>,
    pub notification_users: Vec<i64>,
}

/// 拒否したハンドシェイクのレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}
