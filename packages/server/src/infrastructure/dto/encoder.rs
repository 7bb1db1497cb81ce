//! JSON によるフレームエンコード

use crate::domain::{EncodeError, FrameEncoder, Message};

use super::websocket::MessageFrame;

/// メッセージを [`MessageFrame`] の JSON テキストとして書き出す
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameEncoder;

impl FrameEncoder for JsonFrameEncoder {
    fn encode_message(&self, message: &Message) -> Result<String, EncodeError> {
        serde_json::to_string(&MessageFrame::from(message)).map_err(|e| EncodeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DisplayName, Identity, MessageContent, MessageId, RoomId, Timestamp, UserId,
    };

    fn message() -> Message {
        let sender = Identity::new(UserId::new(7), DisplayName::new("alice".to_string()).unwrap());
        Message::compose(
            RoomId::generate(),
            &sender,
            MessageContent::new("こんにちは".to_string()).unwrap(),
            Timestamp::new(1_672_498_800_000),
        )
    }

    #[test]
    fn test_encode_persisted_message() {
        // テスト項目: 永続化済みメッセージは id 付きの JSON になる
        // given (前提条件):
        let message = message().with_id(MessageId::new(5));

        // when (操作):
        let encoded = JsonFrameEncoder.encode_message(&message).unwrap();

        // then (期待する結果):
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(value["sender_id"], 7);
        assert_eq!(value["sender"], "alice");
        assert_eq!(value["content"], "こんにちは");
        assert_eq!(value["created_at"], "2023-01-01T00:00:00+09:00");
    }

    #[test]
    fn test_encode_unpersisted_message_has_null_id() {
        // テスト項目: 永続化されていないメッセージの id は null になる
        // given (前提条件):
        let message = message();

        // when (操作):
        let encoded = JsonFrameEncoder.encode_message(&message).unwrap();

        // then (期待する結果):
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert!(value["id"].is_null());
    }
}
