//! Repository trait 定義
//!
//! 永続化層 (ユーザー・ルーム・メンバーシップ・メッセージ) へのインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Member, Message, RoomId, StoreError, UserId};

/// どのユーザーがどのルームに属するかを知る外部コンポーネント
///
/// リレーは結果をキャッシュしない。ハンドシェイクとファンアウトのたびに問い合わせる
/// ので、セッション中の退出・招待は次のメッセージから反映される。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn is_member(&self, user_id: UserId, room_id: RoomId) -> Result<bool, StoreError>;

    async fn members_of(&self, room_id: RoomId) -> Result<Vec<Member>, StoreError>;
}

/// メッセージ履歴の永続化
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを追加し、ストアが採番した id 付きで返す
    async fn append(&self, message: Message) -> Result<Message, StoreError>;

    /// `preview` をルームの最新メッセージとして記録
    async fn update_room_preview(&self, room_id: RoomId, preview: String)
    -> Result<(), StoreError>;
}
