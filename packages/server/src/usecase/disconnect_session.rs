//! UseCase: ソケットの登録解除
//!
//! セッションが Closed に入ったときに必ず 1 回呼ばれる。何度呼んでも安全。

use std::sync::Arc;

use crate::domain::{CloseReason, ConnectionId, ConnectionRegistry, RoomId, UserId};

/// ソケット登録解除のユースケース
pub struct DisconnectSessionUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectSessionUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn leave_room(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let removed = self.registry.unregister_room(room_id, connection_id).await;
        tracing::info!(
            room_id = %room_id,
            connection_id = %connection_id,
            removed,
            "room socket left"
        );
        removed
    }

    /// 新しいソケットに置き換わっていなければ、ユーザーの通知ソケットを解除
    pub async fn detach_notifications(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = self.registry.unregister_user(user_id, connection_id).await;
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            removed,
            "notification socket detached"
        );
        removed
    }

    /// 登録中の全ソケットに close を要求する。各セッションは Close フレームを
    /// 送り終えた後に自分で登録を解除する。
    pub async fn close_all(&self, reason: CloseReason) {
        self.registry.close_all(reason).await;
    }
}
