//! Connection Registry のインターフェース
//!
//! このプロセスでどのソケットに届くかを知っているのは Registry だけ。
//! 永続化や認可は判断しない。

use async_trait::async_trait;

use super::{CloseReason, ConnectionHandle, ConnectionId, DisplayName, RoomId, UserId};

/// 1 回のルームブロードキャストの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// ペイロードをキューに積めたソケット数
    pub delivered: usize,
    /// ペイロードを積めず、閉じて取り除いたソケット
    pub evicted: Vec<ConnectionId>,
}

/// Registry のある時点のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// ライブソケットが 1 本以上あるルームと、その本数
    pub rooms: Vec<(RoomId, usize)>,
    /// 通知ソケットを持つユーザー
    pub users: Vec<UserId>,
}

impl RegistrySnapshot {
    pub fn room_connections(&self, room_id: RoomId) -> usize {
        self.rooms
            .iter()
            .find(|(id, _)| *id == room_id)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    /// ソケットが 1 本も登録されていない
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.users.is_empty()
    }
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// ルームのライブソケットに追加する。最初の 1 本でルームのエントリを作る
    async fn register_room(
        &self,
        room_id: RoomId,
        connection: ConnectionHandle,
        display_name: DisplayName,
    );

    /// ルームのライブソケットから取り除く。空になったルームは削除する
    ///
    /// 登録されていないソケットなら `false` を返す。
    async fn unregister_room(&self, room_id: RoomId, connection_id: ConnectionId) -> bool;

    /// ルームの全ライブソケットに `payload` を積む
    ///
    /// 受け取れないソケットは同じ走査の中で閉じて取り除き、他への配送は続ける。
    async fn broadcast_room(&self, room_id: RoomId, payload: &str) -> BroadcastReport;

    /// `connection` をユーザーの唯一の通知ソケットにする
    ///
    /// 置き換えたソケットがあれば返す。
    async fn register_user(
        &self,
        user_id: UserId,
        connection: ConnectionHandle,
    ) -> Option<ConnectionHandle>;

    /// ユーザーの通知ソケットがまだ `connection_id` のときだけ解除する
    async fn unregister_user(&self, user_id: UserId, connection_id: ConnectionId) -> bool;

    async fn snapshot(&self) -> RegistrySnapshot;

    /// 登録中の全ソケットを閉じる
    async fn close_all(&self, reason: CloseReason);
}
