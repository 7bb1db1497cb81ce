//! Publish/Subscribe Broker のインターフェース
//!
//! Broker はユーザー単位の通知を、そのユーザーの通知ソケットを持っている
//! リレープロセスへ橋渡しする。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::{BrokerError, Topic};

/// 1 つのトピックに publish されたペイロードのストリーム
///
/// ストリームを破棄すると購読が解除される。ストリームが自ら終了した場合は
/// Broker との接続が失われたことを意味する。
pub type PayloadStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), BrokerError>;

    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, BrokerError>;
}
