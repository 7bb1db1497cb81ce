//! Entity 定義

use super::value_object::{
    DisplayName, MessageContent, MessageId, RoomId, Timestamp, UserId,
};

/// 検証済みの利用者の身元
///
/// ハンドシェイク時にトークン検証で得られ、セッション中は変わらない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

impl Identity {
    pub fn new(user_id: UserId, display_name: DisplayName) -> Self {
        Self {
            user_id,
            display_name,
        }
    }
}

/// Membership Oracle が返すルームのメンバー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

impl Member {
    pub fn new(user_id: UserId, display_name: DisplayName) -> Self {
        Self {
            user_id,
            display_name,
        }
    }
}

/// チャットメッセージ
///
/// `id` は Message Store が受け付けるまで `None`。永続化に失敗したメッセージも
/// id なしでライブ配信される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<MessageId>,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: DisplayName,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl Message {
    /// `sender` からの未永続化のメッセージを組み立てる
    pub fn compose(
        room_id: RoomId,
        sender: &Identity,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: None,
            room_id,
            sender_id: sender.user_id,
            sender_name: sender.display_name.clone(),
            content,
            created_at,
        }
    }

    pub fn with_id(self, id: MessageId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// 1 通のメッセージについての、1 人の受信者向けのルーム横断通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: DisplayName,
    pub content: MessageContent,
    pub created_at: Timestamp,
    /// 受信者が送信者本人のとき true。本人の他の端末で通知表示を抑えるために使う
    pub from_self: bool,
}

impl Notification {
    pub fn for_recipient(message: &Message, recipient: UserId) -> Self {
        Self {
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            created_at: message.created_at,
            from_self: message.sender_id == recipient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new(UserId::new(1), DisplayName::new("alice".to_string()).unwrap())
    }

    fn hello(room_id: RoomId) -> Message {
        Message::compose(
            room_id,
            &alice(),
            MessageContent::new("hello".to_string()).unwrap(),
            Timestamp::new(1000),
        )
    }

    #[test]
    fn test_compose_message_is_not_persisted() {
        // テスト項目: 生成直後のメッセージは ID を持たない
        // given (前提条件):
        let room_id = RoomId::generate();

        // when (操作):
        let message = hello(room_id);

        // then (期待する結果):
        assert!(!message.is_persisted());
        assert_eq!(message.sender_id, UserId::new(1));
        assert_eq!(message.sender_name.as_str(), "alice");
        assert_eq!(message.created_at, Timestamp::new(1000));
    }

    #[test]
    fn test_with_id_marks_message_persisted() {
        // テスト項目: ID を付与すると永続化済みになる
        // given (前提条件):
        let message = hello(RoomId::generate());

        // when (操作):
        let stored = message.with_id(MessageId::new(7));

        // then (期待する結果):
        assert!(stored.is_persisted());
        assert_eq!(stored.id, Some(MessageId::new(7)));
    }

    #[test]
    fn test_notification_from_self_only_for_sender() {
        // テスト項目: from_self は受信者が送信者のときだけ true になる
        // given (前提条件):
        let message = hello(RoomId::generate());

        // when (操作):
        let to_sender = Notification::for_recipient(&message, UserId::new(1));
        let to_other = Notification::for_recipient(&message, UserId::new(2));

        // then (期待する結果):
        assert!(to_sender.from_self);
        assert!(!to_other.from_self);
        assert_eq!(to_other.sender_id, UserId::new(1));
        assert_eq!(to_other.content.as_str(), "hello");
    }
}
