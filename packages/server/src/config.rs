//! リレーの実行時設定

use std::time::Duration;

use crate::usecase::ResubscribePolicy;

/// 全セッション共通のソケット単位の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// 低速な受信者とみなすまでにキューに積めるフレーム数
    pub outbound_buffer: usize,
    /// 1 回のソケット書き込みの上限時間
    pub write_timeout: Duration,
    pub resubscribe: ResubscribePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 64,
            write_timeout: Duration::from_secs(5),
            resubscribe: ResubscribePolicy::default(),
        }
    }
}
