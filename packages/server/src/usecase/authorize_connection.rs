//! UseCase: ハンドシェイク時の認証・認可
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AuthorizeConnectionUseCase::authorize_room() / authorize_user() メソッド
//!
//! ### なぜこのテストが必要か
//! - アップグレード前に全ての拒否理由が確定していることを保証
//! - 判定順序（トークン → 検証 → ルーム ID → メンバーシップ）を固定する
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーによるルーム接続、通知ソケット接続
//! - 異常系：トークンなし、不正トークン、ルーム ID なし・不正、非メンバー、Oracle 障害

use std::sync::Arc;

use crate::domain::{Identity, MembershipOracle, RoomId, TokenVerifier};

use super::error::HandshakeError;

/// ハンドシェイク認可のユースケース
pub struct AuthorizeConnectionUseCase {
    verifier: Arc<dyn TokenVerifier>,
    oracle: Arc<dyn MembershipOracle>,
}

impl AuthorizeConnectionUseCase {
    pub fn new(verifier: Arc<dyn TokenVerifier>, oracle: Arc<dyn MembershipOracle>) -> Self {
        Self { verifier, oracle }
    }

    /// ルームソケットを認可する
    ///
    /// トークンの有無、トークンの検証、ルーム ID の形式、メンバーかどうかの順に
    /// 確認し、最初の失敗で止める。
    pub async fn authorize_room(
        &self,
        token: Option<&str>,
        room: Option<&str>,
    ) -> Result<(Identity, RoomId), HandshakeError> {
        let identity = self.authorize_user(token).await?;

        let room = room
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| HandshakeError::InvalidRequest("room is required".to_string()))?;
        let room_id =
            RoomId::parse(room).map_err(|e| HandshakeError::InvalidRequest(e.to_string()))?;

        let is_member = self
            .oracle
            .is_member(identity.user_id, room_id)
            .await
            .map_err(HandshakeError::MembershipUnavailable)?;
        if !is_member {
            return Err(HandshakeError::Forbidden {
                user_id: identity.user_id,
                room_id,
            });
        }

        Ok((identity, room_id))
    }

    /// 通知ソケットを認可する (トークンの確認のみ)
    pub async fn authorize_user(&self, token: Option<&str>) -> Result<Identity, HandshakeError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(HandshakeError::Unauthenticated)?;
        Ok(self.verifier.verify(token).await?)
    }
}
