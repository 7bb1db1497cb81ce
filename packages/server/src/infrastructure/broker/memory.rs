//! `tokio::sync::broadcast` による InMemory Broker 実装
//!
//! 同じリレープロセス内の通知 publisher と通知ソケットだけを橋渡しする。
//! トピックごとに broadcast チャネルを持ち、最初の subscribe で作成して
//! 最後の購読ストリームが破棄されたら削除する。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{Broker, BrokerError, PayloadStream, Topic};

/// トピックごとのバッファ既定値。これ以上遅れた受信者はペイロードを取りこぼす
const DEFAULT_BUFFER_SIZE: usize = 256;

type Topics = Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>;

/// プロセス内で完結する Broker
#[derive(Debug)]
pub struct InMemoryBroker {
    topics: Topics,
    buffer_size: usize,
}

/// 1 本の購読。破棄されると、受信者のいなくなったトピックを片付ける
struct Subscription {
    receiver: Option<broadcast::Receiver<Vec<u8>>>,
    topic: String,
    topics: Topics,
}

impl Subscription {
    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "subscriber lagged, payloads dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // the receiver count must already exclude this subscription
        drop(self.receiver.take());
        let topic = std::mem::take(&mut self.topic);
        let topics = self.topics.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { prune_topic(&topics, &topic).await });
        }
    }
}

async fn prune_topic(topics: &Topics, topic: &str) {
    let mut topics = topics.lock().await;
    let idle = topics
        .get(topic)
        .is_some_and(|sender| sender.receiver_count() == 0);
    if idle {
        topics.remove(topic);
        tracing::debug!(topic, "removed topic without subscribers");
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            buffer_size: buffer_size.max(1),
        }
    }

    /// `topic` の購読数
    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .lock()
            .await
            .get(topic.as_str())
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    /// チャネルを持っているトピック数
    pub async fn topic_count(&self) -> usize {
        self.topics.lock().await.len()
    }

    /// トピックのチャネルを破棄し、そのトピックの購読ストリームをすべて終わらせる
    ///
    /// ネットワーク越しの Broker で接続が切れたときに購読側から見える状態と同じ。
    pub async fn disconnect_topic(&self, topic: &Topic) {
        if self.topics.lock().await.remove(topic.as_str()).is_some() {
            tracing::info!(topic = %topic, "broker topic disconnected");
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), BrokerError> {
        let mut topics = self.topics.lock().await;
        let Some(sender) = topics.get(topic.as_str()) else {
            // Nobody subscribed: fire and forget.
            return Ok(());
        };
        if sender.send(payload).is_err() {
            topics.remove(topic.as_str());
            tracing::debug!(topic = %topic, "removed topic without subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, BrokerError> {
        let receiver = {
            let mut topics = self.topics.lock().await;
            topics
                .entry(topic.as_str().to_string())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0)
                .subscribe()
        };
        let subscription = Subscription {
            receiver: Some(receiver),
            topic: topic.as_str().to_string(),
            topics: self.topics.clone(),
        };

        let payloads = stream::unfold(subscription, |mut subscription| async move {
            let payload = subscription.next_payload().await?;
            Some((payload, subscription))
        });
        Ok(Box::pin(payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        // テスト項目: 購読中のトピックに publish したペイロードが届く
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(1));
        let mut stream = broker.subscribe(&topic).await.unwrap();

        // when (操作):
        broker.publish(&topic, b"hello".to_vec()).await.unwrap();

        // then (期待する結果):
        assert_eq!(stream.next().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_publish_is_scoped_to_topic() {
        // テスト項目: 別トピックへの publish は届かない
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let mine = Topic::user(crate::domain::UserId::new(1));
        let other = Topic::user(crate::domain::UserId::new(2));
        let mut stream = broker.subscribe(&mine).await.unwrap();

        // when (操作):
        broker.publish(&other, b"not yours".to_vec()).await.unwrap();

        // then (期待する結果):
        let received = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        // テスト項目: 購読者がいなくても publish は成功する
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(9));

        // when (操作):
        let result = broker.publish(&topic, b"nobody".to_vec()).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(broker.subscriber_count(&topic).await, 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_subscription() {
        // テスト項目: ストリームを破棄すると購読が解除される
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(3));
        let stream = broker.subscribe(&topic).await.unwrap();
        assert_eq!(broker.subscriber_count(&topic).await, 1);

        // when (操作):
        drop(stream);

        // then (期待する結果):
        assert_eq!(broker.subscriber_count(&topic).await, 0);
    }

    #[tokio::test]
    async fn test_dropping_last_stream_removes_topic() {
        // テスト項目: 最後の購読ストリームを破棄すると、publish がなくてもトピックが片付く
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(5));
        let first = broker.subscribe(&topic).await.unwrap();
        let second = broker.subscribe(&topic).await.unwrap();
        drop(first);
        tokio::task::yield_now().await;
        assert_eq!(broker.topic_count().await, 1);

        // when (操作):
        drop(second);

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.topic_count().await != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_resubscribe_after_prune_receives_payloads() {
        // テスト項目: 片付けられたトピックを再購読しても publish が届く
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(6));
        drop(broker.subscribe(&topic).await.unwrap());
        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.topic_count().await != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        // when (操作):
        let mut stream = broker.subscribe(&topic).await.unwrap();
        broker.publish(&topic, b"again".to_vec()).await.unwrap();

        // then (期待する結果):
        assert_eq!(stream.next().await, Some(b"again".to_vec()));
    }

    #[tokio::test]
    async fn test_disconnect_topic_ends_stream() {
        // テスト項目: トピックの切断で購読ストリームが終了する
        // given (前提条件):
        let broker = InMemoryBroker::new();
        let topic = Topic::user(crate::domain::UserId::new(4));
        let mut stream = broker.subscribe(&topic).await.unwrap();

        // when (操作):
        broker.disconnect_topic(&topic).await;

        // then (期待する結果):
        assert_eq!(stream.next().await, None);
    }
}
