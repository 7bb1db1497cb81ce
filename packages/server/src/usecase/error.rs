//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{AuthError, RoomId, StoreError, UserId};

/// アップグレード前にハンドシェイクを拒否する理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("missing credential")]
    Unauthenticated,
    #[error(transparent)]
    InvalidCredential(#[from] AuthError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("user {user_id} is not a member of room {room_id}")]
    Forbidden { user_id: UserId, room_id: RoomId },
    #[error("membership lookup failed: {0}")]
    MembershipUnavailable(StoreError),
}
