//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};

/// メッセージごとにルームソケットへブロードキャストするフレーム
///
/// ライブ配信はできたが永続化に失敗した場合、`id` は `null` になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFrame {
    pub id: Option<i64>,
    pub room_id: String,
    pub sender_id: i64,
    pub sender: String,
    pub content: String,
    pub created_at: String,
}

/// `user:{id}` に publish され、通知ソケットへそのまま転送されるフレーム
///
/// クライアントが追加の問い合わせなしに未読バッジとプレビューを更新できる情報を持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFrame {
    pub room_id: String,
    pub sender_id: i64,
    pub sender: String,
    pub content: String,
    pub last_message: String,
    pub created_at: String,
    pub from_self: bool,
}
