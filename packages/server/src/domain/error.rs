//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::RoomId;

/// Value Object の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("display name must not be empty")]
    EmptyDisplayName,

    #[error("message content must not be empty")]
    EmptyMessageContent,

    #[error("message content is {length} characters, limit is {max}")]
    MessageContentTooLong { length: usize, max: usize },

    #[error("invalid room id '{0}'")]
    InvalidRoomId(String),
}

/// トークン検証の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// 署名・形式・クレームの不正
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("credential has expired")]
    Expired,
}

/// 永続化側 (Membership Oracle と Message Store) の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Broker が返す失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    #[error("failed to encode payload for '{topic}': {reason}")]
    Encode { topic: String, reason: String },

    #[error("failed to publish to '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    #[error("failed to subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },
}

/// フレームのエンコード失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to encode frame: {0}")]
pub struct EncodeError(pub String);

/// ライブ接続へのフレーム投入の失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 書き込みタスクがいない
    #[error("connection is closed")]
    Closed,

    /// 送信キューが満杯 (相手が読んでいない)
    #[error("outbound queue is full")]
    Overflow,
}
