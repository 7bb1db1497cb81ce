//! UseCase: Registry の状態取得 (デバッグ用)

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, RegistrySnapshot};

/// Registry 状態取得のユースケース
pub struct InspectRegistryUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl InspectRegistryUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self) -> RegistrySnapshot {
        self.registry.snapshot().await
    }
}
