//! 認証情報の検証インターフェース

use async_trait::async_trait;

use super::{AuthError, Identity};

/// 不透明なトークンを検証し、そこに含まれる利用者の身元を返す
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
