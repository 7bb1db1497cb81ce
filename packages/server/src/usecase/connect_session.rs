//! UseCase: ソケットの登録
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::join_room() / attach_notifications() メソッド
//!
//! ### なぜこのテストが必要か
//! - 認可済みソケットだけが Registry に入ることの入口
//! - 通知ソケットはユーザーごとに 1 つ。置き換えられた古いソケットが確実に閉じられることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加、通知ソケットの初回登録
//! - エッジケース：同一ユーザーの通知ソケット再接続

use std::sync::Arc;

use crate::domain::{
    CloseReason, ConnectionHandle, ConnectionRegistry, Identity, RoomId, UserId,
};

/// ソケット登録のユースケース
pub struct ConnectSessionUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl ConnectSessionUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 認可済みのルームソケットを登録
    pub async fn join_room(&self, room_id: RoomId, identity: &Identity, connection: ConnectionHandle) {
        tracing::info!(
            room_id = %room_id,
            user_id = %identity.user_id,
            connection_id = %connection.id(),
            "room socket joined"
        );
        self.registry
            .register_room(room_id, connection, identity.display_name.clone())
            .await;
    }

    /// `connection` をユーザーの通知ソケットにする
    ///
    /// 置き換えられたソケットは [`CloseReason::Replaced`] で閉じる。
    ///
    /// # Returns
    ///
    /// 以前のソケットを置き換えたかどうか
    pub async fn attach_notifications(&self, user_id: UserId, connection: ConnectionHandle) -> bool {
        let connection_id = connection.id();
        let Some(previous) = self.registry.register_user(user_id, connection).await else {
            tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "notification socket attached"
            );
            return false;
        };
        if previous.id() == connection_id {
            return false;
        }
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            replaced = %previous.id(),
            "notification socket replaced"
        );
        previous.close(CloseReason::Replaced);
        true
    }
}
