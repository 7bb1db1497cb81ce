//! 通知 publish のインターフェース

use async_trait::async_trait;

use super::{BrokerError, Notification, UserId};

/// 1 件の通知を 1 人の受信者のトピックに publish する
///
/// 呼び出しごとに状態を持たない。複数の受信者へファンアウトする呼び出し側は、
/// 1 件の失敗で残りを止めない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(
        &self,
        recipient: UserId,
        notification: &Notification,
    ) -> Result<(), BrokerError>;
}
