//! UseCase: 通知ブリッジ (Broker → 通知ソケット)
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ForwardNotificationsUseCase::execute() メソッド
//! - `user:{id}` トピックの購読と、受信ペイロードのソケットへのそのままの転送
//!
//! ### なぜこのテストが必要か
//! - 転送タスクがソケットより長生きしないことを保証
//! - Broker の購読が切れても黙って止まらず、再購読するか理由付きで閉じること
//!
//! ### どのような状況を想定しているか
//! - 正常系：publish されたペイロードの転送
//! - 異常系：購読ストリームの終了 (再購読)、購読失敗の連続 (BrokerUnavailable)
//! - エッジケース：ソケット側が閉じている、読まないクライアント、UTF-8 でないペイロード

use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;

use crate::domain::{
    Broker, CloseReason, ConnectionHandle, DeliveryError, Topic, UserId,
};

/// 切れた Broker の購読を張り直す方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResubscribePolicy {
    /// 諦めるまでに許す連続した購読失敗の回数
    pub max_attempts: u32,
    /// 基本の待ち時間。`n` 回目は `interval * n` 待つ
    pub interval: Duration,
}

impl ResubscribePolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.interval.saturating_mul(attempt)
    }
}

impl Default for ResubscribePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(500),
        }
    }
}

/// 転送が止まった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardExit {
    /// 先にソケットがいなくなった
    SocketClosed,
    /// ソケットが読まなくなったので閉じた
    SlowConsumer,
    /// 再購読を使い切ったのでソケットを閉じた
    BrokerUnavailable,
}

/// 通知転送のユースケース
pub struct ForwardNotificationsUseCase {
    broker: Arc<dyn Broker>,
    policy: ResubscribePolicy,
}

impl ForwardNotificationsUseCase {
    /// 新しい ForwardNotificationsUseCase を作成
    pub fn new(broker: Arc<dyn Broker>, policy: ResubscribePolicy) -> Self {
        Self { broker, policy }
    }

    /// `user:{user_id}` に publish されたペイロードを、どちらかが終わるまで
    /// `connection` に転送する
    ///
    /// 返した Future を破棄すると購読も一緒に破棄される。
    ///
    /// # Arguments
    ///
    /// * `user_id` - 通知ソケットの持ち主
    /// * `connection` - 転送先の通知ソケット
    ///
    /// # Returns
    ///
    /// 転送が止まった理由
    pub async fn execute(&self, user_id: UserId, connection: ConnectionHandle) -> ForwardExit {
        let topic = Topic::user(user_id);
        let mut failures: u32 = 0;

        loop {
            if connection.is_closed() {
                return ForwardExit::SocketClosed;
            }

            match self.broker.subscribe(&topic).await {
                Ok(mut stream) => {
                    tracing::debug!(topic = %topic, connection_id = %connection.id(), "subscribed");
                    while let Some(payload) = stream.next().await {
                        let frame = match String::from_utf8(payload) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::warn!(topic = %topic, error = %e, "skipping non-UTF-8 payload");
                                continue;
                            }
                        };
                        failures = 0;
                        match connection.deliver(frame) {
                            Ok(()) => {}
                            Err(DeliveryError::Closed) => return ForwardExit::SocketClosed,
                            Err(DeliveryError::Overflow) => {
                                tracing::warn!(
                                    topic = %topic,
                                    connection_id = %connection.id(),
                                    "notification socket is not reading, closing"
                                );
                                connection.close(CloseReason::SlowConsumer);
                                return ForwardExit::SlowConsumer;
                            }
                        }
                    }
                    tracing::warn!(topic = %topic, "broker subscription ended");
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "broker subscribe failed");
                }
            }

            failures += 1;
            if failures > self.policy.max_attempts {
                tracing::error!(
                    topic = %topic,
                    attempts = failures - 1,
                    "giving up on broker subscription"
                );
                connection.close(CloseReason::BrokerUnavailable);
                return ForwardExit::BrokerUnavailable;
            }
            let delay = self.policy.backoff(failures);
            tracing::info!(topic = %topic, attempt = failures, delay = ?delay, "resubscribing");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BrokerError, PayloadStream, open_connection},
        infrastructure::broker::InMemoryBroker,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_policy(max_attempts: u32) -> ResubscribePolicy {
        ResubscribePolicy {
            max_attempts,
            interval: Duration::from_millis(5),
        }
    }

    async fn wait_for_subscriber(broker: &InMemoryBroker, topic: &Topic) {
        timeout(WAIT, async {
            while broker.subscriber_count(topic).await == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber never appeared");
    }

    /// subscribe が常に失敗する Broker
    #[derive(Default)]
    struct UnreachableBroker {
        subscribe_calls: AtomicUsize,
    }

    #[async_trait]
    impl Broker for UnreachableBroker {
        async fn publish(&self, _topic: &Topic, _payload: Vec<u8>) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, BrokerError> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            Err(BrokerError::Subscribe {
                topic: topic.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_execute_forwards_payload_verbatim() {
        // テスト項目: publish されたペイロードがそのままソケットへ転送される
        // given (前提条件):
        let broker = Arc::new(InMemoryBroker::new());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(1));
        let (handle, mut outbox) = open_connection(4);
        let topic = Topic::user(UserId::new(2));
        let task = tokio::spawn(async move { usecase.execute(UserId::new(2), handle).await });
        wait_for_subscriber(&broker, &topic).await;

        // when (操作):
        broker
            .publish(&topic, br#"{"content":"hi"}"#.to_vec())
            .await
            .unwrap();

        // then (期待する結果):
        let frame = timeout(WAIT, outbox.frames.recv()).await.unwrap();
        assert_eq!(frame, Some(r#"{"content":"hi"}"#.to_string()));
        task.abort();
    }

    #[tokio::test]
    async fn test_execute_resubscribes_after_stream_ends() {
        // テスト項目: 購読ストリームが終了しても再購読して転送を続ける
        // given (前提条件):
        let broker = Arc::new(InMemoryBroker::new());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(3));
        let (handle, mut outbox) = open_connection(4);
        let topic = Topic::user(UserId::new(2));
        let task = tokio::spawn(async move { usecase.execute(UserId::new(2), handle).await });
        wait_for_subscriber(&broker, &topic).await;

        // when (操作):
        broker.disconnect_topic(&topic).await;
        wait_for_subscriber(&broker, &topic).await;
        broker.publish(&topic, b"after".to_vec()).await.unwrap();

        // then (期待する結果):
        let frame = timeout(WAIT, outbox.frames.recv()).await.unwrap();
        assert_eq!(frame, Some("after".to_string()));
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test]
    async fn test_execute_closes_socket_when_broker_unreachable() {
        // テスト項目: 再購読を使い切ると BrokerUnavailable で閉じる
        // given (前提条件):
        let broker = Arc::new(UnreachableBroker::default());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(2));
        let (handle, mut outbox) = open_connection(4);

        // when (操作):
        let exit = timeout(WAIT, usecase.execute(UserId::new(2), handle))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(exit, ForwardExit::BrokerUnavailable);
        assert_eq!(broker.subscribe_calls.load(Ordering::SeqCst), 3);
        assert_eq!(outbox.closed().await, CloseReason::BrokerUnavailable);
    }

    #[tokio::test]
    async fn test_execute_stops_when_socket_closed() {
        // テスト項目: ソケットが閉じたら転送タスクも終了し、購読が解除される
        // given (前提条件):
        let broker = Arc::new(InMemoryBroker::new());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(1));
        let (handle, outbox) = open_connection(4);
        let topic = Topic::user(UserId::new(2));
        let task = tokio::spawn(async move { usecase.execute(UserId::new(2), handle).await });
        wait_for_subscriber(&broker, &topic).await;

        // when (操作):
        drop(outbox);
        broker.publish(&topic, b"lost".to_vec()).await.unwrap();

        // then (期待する結果):
        let exit = timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(exit, ForwardExit::SocketClosed);
        assert_eq!(broker.subscriber_count(&topic).await, 0);
    }

    #[tokio::test]
    async fn test_execute_closes_slow_consumer() {
        // テスト項目: 読まないクライアントは SlowConsumer で閉じられる
        // given (前提条件):
        let broker = Arc::new(InMemoryBroker::new());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(1));
        let (handle, mut outbox) = open_connection(1);
        let topic = Topic::user(UserId::new(2));
        let task = tokio::spawn(async move { usecase.execute(UserId::new(2), handle).await });
        wait_for_subscriber(&broker, &topic).await;

        // when (操作):
        broker.publish(&topic, b"one".to_vec()).await.unwrap();
        broker.publish(&topic, b"two".to_vec()).await.unwrap();

        // then (期待する結果):
        let exit = timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(exit, ForwardExit::SlowConsumer);
        assert_eq!(outbox.closed().await, CloseReason::SlowConsumer);
    }

    #[tokio::test]
    async fn test_execute_skips_non_utf8_payload() {
        // テスト項目: UTF-8 でないペイロードは読み飛ばし、後続は転送する
        // given (前提条件):
        let broker = Arc::new(InMemoryBroker::new());
        let usecase = ForwardNotificationsUseCase::new(broker.clone(), fast_policy(1));
        let (handle, mut outbox) = open_connection(4);
        let topic = Topic::user(UserId::new(2));
        let task = tokio::spawn(async move { usecase.execute(UserId::new(2), handle).await });
        wait_for_subscriber(&broker, &topic).await;

        // when (操作):
        broker.publish(&topic, vec![0xff, 0xfe]).await.unwrap();
        broker.publish(&topic, b"ok".to_vec()).await.unwrap();

        // then (期待する結果):
        let frame = timeout(WAIT, outbox.frames.recv()).await.unwrap();
        assert_eq!(frame, Some("ok".to_string()));
        task.abort();
    }

    #[test]
    fn test_backoff_grows_linearly() {
        // テスト項目: 待ち時間は試行回数に比例する
        // given (前提条件):
        let policy = ResubscribePolicy {
            max_attempts: 5,
            interval: Duration::from_millis(100),
        };

        // when (操作):
        let delays: Vec<Duration> = (1..=3).map(|n| policy.backoff(n)).collect();

        // then (期待する結果):
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300)
            ]
        );
    }
}
