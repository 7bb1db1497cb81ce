//! 固定のトークン表による TokenVerifier 実装

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{AuthError, Identity, TokenVerifier};

#[derive(Debug, Default)]
pub struct InMemoryTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl InMemoryTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl TokenVerifier for InMemoryTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidCredential("unknown token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, UserId};

    #[tokio::test]
    async fn test_known_and_unknown_tokens() {
        // テスト項目: 登録済みトークンのみ検証に成功する
        // given (前提条件):
        let alice = Identity::new(UserId::new(1), DisplayName::new("alice".to_string()).unwrap());
        let verifier = InMemoryTokenVerifier::new().with_token("t-alice", alice.clone());

        // when (操作):
        let known = verifier.verify("t-alice").await;
        let unknown = verifier.verify("t-bob").await;

        // then (期待する結果):
        assert_eq!(known, Ok(alice));
        assert!(matches!(unknown, Err(AuthError::InvalidCredential(_))));
    }
}
