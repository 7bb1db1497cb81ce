//! Value Object 定義
//!
//! 不変で、生成時に検証されるドメインの値。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// 1 通のメッセージに許される最大文字数
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// 認証基盤が発行するユーザー ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ルーム ID (128 ビットの UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(Uuid);

impl RoomId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    /// 文字列からルーム ID を読み取る
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidRoomId(value.to_string()))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// トークンやメンバー一覧に含まれる表示名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyDisplayName);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// メッセージ本文
///
/// 空白は送られたまま保持する。拒否するのは空白だけの本文と、
/// [`MAX_MESSAGE_CHARS`] 文字を超える本文だけ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyMessageContent);
        }
        let length = value.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ValueObjectError::MessageContentTooLong {
                length,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Message Store が追加時に採番する ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// サーバー時刻で付与する Unix タイムスタンプ (ミリ秒)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// ライブソケットの ID。プロセスの生存中は一意
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broker のトピック名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// ユーザーごとの通知トピック `user:{user_id}`
    pub fn user(user_id: UserId) -> Self {
        Self(format!("user:{}", user_id.value()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_parse_valid_uuid() {
        // テスト項目: UUID 形式の文字列から RoomId を生成できる
        // given (前提条件):
        let raw = "6f1c2b8e-2f6a-4d59-9a4b-0d3f1d9c7e21";

        // when (操作):
        let result = RoomId::parse(raw);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().to_string(), raw);
    }

    #[test]
    fn test_room_id_parse_malformed() {
        // テスト項目: UUID でない文字列はエラーになる
        // given (前提条件):
        let raw = "general";

        // when (操作):
        let result = RoomId::parse(raw);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::InvalidRoomId("general".to_string()))
        );
    }

    #[test]
    fn test_display_name_rejects_blank() {
        // テスト項目: 空白のみの表示名は拒否される
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result = DisplayName::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyDisplayName));
    }

    #[test]
    fn test_message_content_rejects_empty() {
        // テスト項目: 空のメッセージは拒否される
        // given (前提条件):
        let raw = String::new();

        // when (操作):
        let result = MessageContent::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyMessageContent));
    }

    #[test]
    fn test_message_content_length_limit_counts_chars() {
        // テスト項目: 文字数 (バイト数ではない) で上限が判定される
        // given (前提条件): マルチバイト文字でちょうど上限
        let at_limit = "あ".repeat(MAX_MESSAGE_CHARS);
        let over_limit = "あ".repeat(MAX_MESSAGE_CHARS + 1);

        // when (操作):
        let ok = MessageContent::new(at_limit);
        let too_long = MessageContent::new(over_limit);

        // then (期待する結果):
        assert!(ok.is_ok());
        assert_eq!(
            too_long,
            Err(ValueObjectError::MessageContentTooLong {
                length: MAX_MESSAGE_CHARS + 1,
                max: MAX_MESSAGE_CHARS,
            })
        );
    }

    #[test]
    fn test_user_topic_format() {
        // テスト項目: ユーザー通知トピックは user:{id} 形式になる
        // given (前提条件):
        let user_id = UserId::new(42);

        // when (操作):
        let topic = Topic::user(user_id);

        // then (期待する結果):
        assert_eq!(topic.as_str(), "user:42");
    }
}
