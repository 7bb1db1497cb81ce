//! インメモリ Message Store 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, MessageId, MessageStore, RoomId, StoreError};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    messages: Vec<Message>,
    previews: HashMap<RoomId, String>,
}

/// 追記のみのメッセージ履歴と、ルームごとの最新メッセージのプレビュー
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    inner: Mutex<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// ルームのメッセージを追加順で返す
    pub async fn messages_in(&self, room_id: RoomId) -> Vec<Message> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }

    pub async fn preview(&self, room_id: RoomId) -> Option<String> {
        self.inner.lock().await.previews.get(&room_id).cloned()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: Message) -> Result<Message, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let stored = message.with_id(MessageId::new(inner.next_id));
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn update_room_preview(
        &self,
        room_id: RoomId,
        preview: String,
    ) -> Result<(), StoreError> {
        self.inner.lock().await.previews.insert(room_id, preview);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Identity, MessageContent, Timestamp, UserId};

    fn message(room_id: RoomId, content: &str) -> Message {
        let sender = Identity::new(UserId::new(1), DisplayName::new("alice".to_string()).unwrap());
        Message::compose(
            room_id,
            &sender,
            MessageContent::new(content.to_string()).unwrap(),
            Timestamp::new(1_000),
        )
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        // テスト項目: append ごとに増加する ID が振られる
        // given (前提条件):
        let store = InMemoryMessageStore::new();
        let room_id = RoomId::generate();

        // when (操作):
        let first = store.append(message(room_id, "one")).await.unwrap();
        let second = store.append(message(room_id, "two")).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.id, Some(MessageId::new(1)));
        assert_eq!(second.id, Some(MessageId::new(2)));
        let history = store.messages_in(room_id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content.as_str(), "two");
    }

    #[tokio::test]
    async fn test_update_room_preview_overwrites() {
        // テスト項目: プレビューは最新の内容で上書きされる
        // given (前提条件):
        let store = InMemoryMessageStore::new();
        let room_id = RoomId::generate();
        store
            .update_room_preview(room_id, "one".to_string())
            .await
            .unwrap();

        // when (操作):
        store
            .update_room_preview(room_id, "two".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(store.preview(room_id).await, Some("two".to_string()));
    }
}
