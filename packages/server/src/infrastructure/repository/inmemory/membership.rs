//! インメモリ Membership Oracle 実装
//!
//! メンバーシップは実行中に変更できる (招待・退出)。Relay はキャッシュしないため、
//! 変更は次のハンドシェイク・次のメッセージから反映される。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Member, MembershipOracle, RoomId, StoreError, UserId};

#[derive(Debug, Default)]
pub struct InMemoryMembershipOracle {
    rooms: RwLock<HashMap<RoomId, Vec<Member>>>,
}

impl InMemoryMembershipOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空のルームを作成。既存のルームはそのまま
    pub async fn create_room(&self, room_id: RoomId) {
        self.rooms.write().await.entry(room_id).or_default();
    }

    /// ルームに `member` を追加 (ルームがなければ作成)
    ///
    /// 既存メンバーを再追加すると表示名を更新する。
    pub async fn add_member(&self, room_id: RoomId, member: Member) {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room_id).or_default();
        match members.iter_mut().find(|m| m.user_id == member.user_id) {
            Some(existing) => existing.display_name = member.display_name,
            None => members.push(member),
        }
    }

    /// ルームからメンバーを外す。メンバーでなかった場合は `false`
    pub async fn remove_member(&self, room_id: RoomId, user_id: UserId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(&room_id) else {
            return false;
        };
        let before = members.len();
        members.retain(|m| m.user_id != user_id);
        before != members.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl MembershipOracle for InMemoryMembershipOracle {
    async fn is_member(&self, user_id: UserId, room_id: RoomId) -> Result<bool, StoreError> {
        Ok(self
            .rooms
            .read()
            .await
            .get(&room_id)
            .is_some_and(|members| members.iter().any(|m| m.user_id == user_id)))
    }

    async fn members_of(&self, room_id: RoomId) -> Result<Vec<Member>, StoreError> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(StoreError::RoomNotFound(room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DisplayName;

    fn member(id: i64, name: &str) -> Member {
        Member::new(UserId::new(id), DisplayName::new(name.to_string()).unwrap())
    }

    #[tokio::test]
    async fn test_is_member_reflects_membership() {
        // テスト項目: メンバーのみ is_member が true になる
        // given (前提条件):
        let oracle = InMemoryMembershipOracle::new();
        let room_id = RoomId::generate();
        oracle.add_member(room_id, member(1, "alice")).await;

        // when (操作):
        let alice = oracle.is_member(UserId::new(1), room_id).await;
        let bob = oracle.is_member(UserId::new(2), room_id).await;
        let unknown_room = oracle.is_member(UserId::new(1), RoomId::generate()).await;

        // then (期待する結果):
        assert_eq!(alice, Ok(true));
        assert_eq!(bob, Ok(false));
        assert_eq!(unknown_room, Ok(false));
    }

    #[tokio::test]
    async fn test_remove_member_takes_effect_immediately() {
        // テスト項目: 退出したメンバーは直後の問い合わせから除外される
        // given (前提条件):
        let oracle = InMemoryMembershipOracle::new();
        let room_id = RoomId::generate();
        oracle.add_member(room_id, member(1, "alice")).await;
        oracle.add_member(room_id, member(2, "bob")).await;

        // when (操作):
        let removed = oracle.remove_member(room_id, UserId::new(2)).await;

        // then (期待する結果):
        assert!(removed);
        let members = oracle.members_of(room_id).await.unwrap();
        assert_eq!(members, vec![member(1, "alice")]);
        assert_eq!(oracle.is_member(UserId::new(2), room_id).await, Ok(false));
    }

    #[tokio::test]
    async fn test_add_member_twice_updates_name() {
        // テスト項目: 同じユーザーを再追加しても重複せず表示名が更新される
        // given (前提条件):
        let oracle = InMemoryMembershipOracle::new();
        let room_id = RoomId::generate();
        oracle.add_member(room_id, member(1, "alice")).await;

        // when (操作):
        oracle.add_member(room_id, member(1, "alice2")).await;

        // then (期待する結果):
        assert_eq!(
            oracle.members_of(room_id).await.unwrap(),
            vec![member(1, "alice2")]
        );
    }

    #[tokio::test]
    async fn test_members_of_unknown_room() {
        // テスト項目: 存在しないルームのメンバー取得は RoomNotFound になる
        // given (前提条件):
        let oracle = InMemoryMembershipOracle::new();
        let room_id = RoomId::generate();

        // when (操作):
        let result = oracle.members_of(room_id).await;

        // then (期待する結果):
        assert_eq!(result, Err(StoreError::RoomNotFound(room_id)));
    }
}
