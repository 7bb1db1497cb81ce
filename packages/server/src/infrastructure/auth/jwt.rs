//! JWT による TokenVerifier 実装

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, DisplayName, Identity, TokenVerifier, UserId};

/// リレー用トークンのクレーム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: i64,
    pub user_name: String,
    /// 有効期限 (Unix エポックからの秒数)
    pub exp: usize,
}

/// 共有シークレットで HS256 署名のトークンを検証する
pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidCredential(e.to_string()),
            }
        })?;
        let claims = data.claims;
        let display_name = DisplayName::new(claims.user_name)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;
        Ok(Identity::new(UserId::new(claims.user_id), display_name))
    }
}
