//! PostgreSQL の LISTEN/NOTIFY を使った Broker
//!
//! 同じデータベースを共有するリレープロセス間で通知を橋渡しする。ユーザーの通知
//! ソケットをどのプロセスが持っていても、そのプロセスの購読に届く。
//!
//! - publish は共有の接続で `pg_notify` を呼ぶ。切れていれば次の publish で張り直す
//! - 購読は 1 本の LISTEN 専用接続にまとめ、チャンネルごとに購読ストリームへ振り分ける
//! - LISTEN 接続が切れると全購読ストリームが終了する。呼び出し側の再購読で新しい
//!   接続が張られる
//!
//! NOTIFY のペイロードは 8000 バイト未満のテキストに限られる。これを超える
//! ペイロードの publish は失敗として返す。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures_util::stream;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_postgres::{AsyncMessage, Client, Connection, NoTls, Socket, tls::NoTlsStream};

use crate::domain::{Broker, BrokerError, PayloadStream, Topic};

/// NOTIFY に載せられるペイロードの上限 (バイト)
pub const MAX_NOTIFY_PAYLOAD_BYTES: usize = 7999;

/// 他のアプリケーションとチャンネル名が衝突しないための接頭辞
const CHANNEL_PREFIX: &str = "dengon_";

/// 購読 1 本あたりのバッファ。溢れた分は捨てて警告する
const DEFAULT_BUFFER_SIZE: usize = 256;

/// トピックを PostgreSQL のチャンネル名 (識別子) に変換
///
/// 英数字以外は `_` に置き換え、小文字にそろえる。`user:42` は
/// `dengon_user_42` になる。
pub fn channel_name(topic: &Topic) -> String {
    let sanitized: String = topic
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{CHANNEL_PREFIX}{sanitized}")
}

/// publish 前にペイロードを NOTIFY で送れるテキストに変換
fn notify_payload(topic: &Topic, payload: Vec<u8>) -> Result<String, BrokerError> {
    let text = String::from_utf8(payload).map_err(|e| BrokerError::Encode {
        topic: topic.to_string(),
        reason: e.to_string(),
    })?;
    if text.len() > MAX_NOTIFY_PAYLOAD_BYTES {
        return Err(BrokerError::Publish {
            topic: topic.to_string(),
            reason: format!(
                "payload is {} bytes, NOTIFY allows {MAX_NOTIFY_PAYLOAD_BYTES}",
                text.len()
            ),
        });
    }
    Ok(text)
}

/// LISTEN 接続で受けた通知の振り分け先
///
/// `channels` にキーがあることと、そのチャンネルを LISTEN 中であることが一致する。
#[derive(Debug, Default)]
struct Routes {
    channels: HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>,
    /// LISTEN 接続が切れた
    closed: bool,
}

impl Routes {
    /// 購読を追加し、このチャンネルを新たに LISTEN する必要があれば true を返す
    fn add(&mut self, channel: &str, sender: mpsc::Sender<Vec<u8>>) -> bool {
        let listening = self.channels.contains_key(channel);
        let senders = self.channels.entry(channel.to_string()).or_default();
        senders.retain(|sender| !sender.is_closed());
        senders.push(sender);
        !listening
    }

    /// 通知を購読ストリームへ渡し、閉じた購読を取り除く
    ///
    /// # Returns
    ///
    /// ペイロードを受け取った購読の数
    fn dispatch(&mut self, channel: &str, payload: &[u8]) -> usize {
        let Some(senders) = self.channels.get_mut(channel) else {
            return 0;
        };
        let mut delivered = 0;
        senders.retain(|sender| match sender.try_send(payload.to_vec()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(channel, "subscriber lagged, payload dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        delivered
    }

    /// 閉じた購読を取り除き、チャンネルが空になったら UNLISTEN が必要として true を返す
    fn release(&mut self, channel: &str) -> bool {
        if self.closed {
            return false;
        }
        let Some(senders) = self.channels.get_mut(channel) else {
            return false;
        };
        senders.retain(|sender| !sender.is_closed());
        if senders.is_empty() {
            self.channels.remove(channel);
            return true;
        }
        false
    }

    /// 接続断。全購読ストリームを終了させる
    fn close(&mut self) {
        self.closed = true;
        self.channels.clear();
    }
}

/// LISTEN 専用の接続
struct Listener {
    client: Arc<Client>,
    routes: Arc<Mutex<Routes>>,
    /// LISTEN / UNLISTEN の発行と `routes` の更新を直列化する
    listen_lock: Arc<Mutex<()>>,
    driver: JoinHandle<()>,
}

impl Listener {
    async fn connect(database_url: &str) -> Result<Self, tokio_postgres::Error> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        let routes = Arc::new(Mutex::new(Routes::default()));
        let driver = tokio::spawn(drive_listener(connection, routes.clone()));
        tracing::info!("broker listener connected");
        Ok(Self {
            client: Arc::new(client),
            routes,
            listen_lock: Arc::new(Mutex::new(())),
            driver,
        })
    }

    fn is_alive(&self) -> bool {
        !self.driver.is_finished() && !self.client.is_closed()
    }

    async fn listen(
        &self,
        topic: &Topic,
        channel: &str,
        sender: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), BrokerError> {
        let subscribe_error = |reason: String| BrokerError::Subscribe {
            topic: topic.to_string(),
            reason,
        };

        let _listen = self.listen_lock.lock().await;
        let needs_listen = {
            let mut routes = self.routes.lock().await;
            if routes.closed {
                return Err(subscribe_error("listener connection closed".to_string()));
            }
            routes.add(channel, sender)
        };
        if needs_listen {
            // チャンネル名は英数字と `_` だけなのでそのまま埋め込める
            if let Err(e) = self.client.batch_execute(&format!("LISTEN {channel}")).await {
                self.routes.lock().await.channels.remove(channel);
                return Err(subscribe_error(e.to_string()));
            }
            tracing::debug!(channel, "listening");
        }
        Ok(())
    }

    fn release_for(&self, channel: &str) -> Release {
        Release {
            channel: channel.to_string(),
            client: self.client.clone(),
            routes: self.routes.clone(),
            listen_lock: self.listen_lock.clone(),
        }
    }
}

/// 接続を駆動し、届いた通知を振り分ける
///
/// `Client` への問い合わせもこの駆動で進むため、ここでは問い合わせを await しない。
async fn drive_listener(
    mut connection: Connection<Socket, NoTlsStream>,
    routes: Arc<Mutex<Routes>>,
) {
    loop {
        match std::future::poll_fn(|cx| connection.poll_message(cx)).await {
            Some(Ok(AsyncMessage::Notification(notification))) => {
                routes
                    .lock()
                    .await
                    .dispatch(notification.channel(), notification.payload().as_bytes());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(error = %e, "broker listener connection failed");
                break;
            }
            None => {
                tracing::info!("broker listener connection closed");
                break;
            }
        }
    }
    routes.lock().await.close();
}

/// 購読ストリームの破棄時に、チャンネルが不要になっていれば UNLISTEN する
struct Release {
    channel: String,
    client: Arc<Client>,
    routes: Arc<Mutex<Routes>>,
    listen_lock: Arc<Mutex<()>>,
}

impl Release {
    async fn run(self) {
        let _listen = self.listen_lock.lock().await;
        let unlisten = self.routes.lock().await.release(&self.channel);
        if !unlisten {
            return;
        }
        match self
            .client
            .batch_execute(&format!("UNLISTEN {}", self.channel))
            .await
        {
            Ok(()) => tracing::debug!(channel = %self.channel, "unlistened"),
            Err(e) => tracing::debug!(channel = %self.channel, error = %e, "unlisten failed"),
        }
    }
}

struct Subscription {
    receiver: mpsc::Receiver<Vec<u8>>,
    release: Option<Release>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // release は送信側が閉じていることで破棄済みの購読を見分ける
        self.receiver.close();
        if let Some(release) = self.release.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(release.run());
            }
        }
    }
}

/// 複数プロセスで共有できる Broker
///
/// # 使用例
///
/// ```ignore
/// let broker = PostgresBroker::connect("postgres://dengon@localhost/dengon").await?;
/// ```
pub struct PostgresBroker {
    database_url: String,
    buffer_size: usize,
    publisher: Mutex<Option<Client>>,
    listener: Mutex<Option<Listener>>,
}

impl PostgresBroker {
    /// 接続できることを確かめてから Broker を作成
    ///
    /// # Errors
    ///
    /// データベースに接続できない場合は [`BrokerError::Connect`] を返す
    pub async fn connect(database_url: &str) -> Result<Self, BrokerError> {
        let client = connect_client(database_url)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        client
            .batch_execute("SELECT 1")
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        tracing::info!("broker connected");
        Ok(Self {
            database_url: database_url.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            publisher: Mutex::new(Some(client)),
            listener: Mutex::new(None),
        })
    }
}

async fn connect_client(database_url: &str) -> Result<Client, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "broker publish connection failed");
        }
    });
    Ok(client)
}

#[async_trait]
impl Broker for PostgresBroker {
    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), BrokerError> {
        let text = notify_payload(topic, payload)?;
        let channel = channel_name(topic);
        let publish_error = |reason: String| BrokerError::Publish {
            topic: topic.to_string(),
            reason,
        };

        let mut publisher = self.publisher.lock().await;
        let client = match publisher.take() {
            Some(client) if !client.is_closed() => client,
            _ => connect_client(&self.database_url)
                .await
                .map_err(|e| publish_error(e.to_string()))?,
        };
        client
            .execute("SELECT pg_notify($1, $2)", &[&channel, &text])
            .await
            .map_err(|e| publish_error(e.to_string()))?;
        // 失敗した接続は戻さず、次の publish で張り直す
        *publisher = Some(client);
        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<PayloadStream, BrokerError> {
        let channel = channel_name(topic);

        let mut slot = self.listener.lock().await;
        let listener = match slot.take() {
            Some(listener) if listener.is_alive() => listener,
            _ => Listener::connect(&self.database_url)
                .await
                .map_err(|e| BrokerError::Subscribe {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })?,
        };
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        listener.listen(topic, &channel, sender).await?;
        let subscription = Subscription {
            receiver,
            release: Some(listener.release_for(&channel)),
        };
        *slot = Some(listener);
        drop(slot);

        let payloads = stream::unfold(subscription, |mut subscription| async move {
            let payload = subscription.receiver.recv().await?;
            Some((payload, subscription))
        });
        Ok(Box::pin(payloads))
    }
}
