//! UseCase: メッセージ送信処理 (永続化してからファンアウト)
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 永続化 → メンバー全員への通知 publish → ルームへのブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 永続化失敗・publish 失敗がライブ配信を止めないことを保証
//! - タイムスタンプはサーバー時刻、from_self は受信者が送信者のときだけ true
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人のルームで送信し、通知とエコーが届く
//! - 異常系：Message Store 障害、一部メンバーへの publish 失敗、Oracle 障害

use std::sync::Arc;

use dengon_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRegistry, FrameEncoder, Identity, MembershipOracle, Message,
    MessageContent, MessageStore, Notification, NotificationPublisher, RoomId, Timestamp,
};

/// 1 回のファンアウトの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    /// 配信したメッセージ。永続化できた場合は id を持つ
    pub message: Message,
    pub persisted: bool,
    /// 通知を publish できたメンバー数
    pub notified: usize,
    pub publish_failures: usize,
    /// メッセージフレームを積めたルームソケット数
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    store: Arc<dyn MessageStore>,
    oracle: Arc<dyn MembershipOracle>,
    registry: Arc<dyn ConnectionRegistry>,
    publisher: Arc<dyn NotificationPublisher>,
    encoder: Arc<dyn FrameEncoder>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        store: Arc<dyn MessageStore>,
        oracle: Arc<dyn MembershipOracle>,
        registry: Arc<dyn ConnectionRegistry>,
        publisher: Arc<dyn NotificationPublisher>,
        encoder: Arc<dyn FrameEncoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            oracle,
            registry,
            publisher,
            encoder,
            clock,
        }
    }

    /// 受信したメッセージを永続化してから、両方の経路で配信する
    ///
    /// 呼び出し側には失敗を返さない。永続化と publish の失敗はログに出して数え、
    /// ルームへのブロードキャストは必ず行う。
    ///
    /// # Arguments
    ///
    /// * `room_id` - 送信先のルーム
    /// * `sender` - ハンドシェイクで検証済みの送信者
    /// * `content` - 検証済みの本文
    ///
    /// # Returns
    ///
    /// 永続化・通知・ブロードキャストの結果
    pub async fn execute(
        &self,
        room_id: RoomId,
        sender: &Identity,
        content: MessageContent,
    ) -> FanOutReport {
        // 1. サーバー時刻でメッセージを組み立てる
        let created_at = Timestamp::new(self.clock.now_millis());
        let composed = Message::compose(room_id, sender, content, created_at);

        // 2. 永続化 (失敗しても配信は続ける)
        let (message, persisted) = self.persist(composed).await;

        // 3. 現在のメンバー全員の通知トピックへ publish
        let (notified, publish_failures) = self.publish_notifications(&message).await;

        // 4. ルームのソケットへブロードキャスト
        let (delivered, evicted) = match self.encoder.encode_message(&message) {
            Ok(payload) => {
                let report = self.registry.broadcast_room(room_id, &payload).await;
                (report.delivered, report.evicted)
            }
            Err(e) => {
                tracing::error!(room_id = %room_id, error = %e, "failed to encode message frame");
                (0, Vec::new())
            }
        };

        tracing::debug!(
            room_id = %room_id,
            sender_id = %sender.user_id,
            persisted,
            notified,
            publish_failures,
            delivered,
            evicted = evicted.len(),
            "message fanned out"
        );

        FanOutReport {
            message,
            persisted,
            notified,
            publish_failures,
            delivered,
            evicted,
        }
    }

    async fn persist(&self, message: Message) -> (Message, bool) {
        let room_id = message.room_id;
        let stored = match self.store.append(message.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    room_id = %room_id,
                    sender_id = %message.sender_id,
                    error = %e,
                    "failed to persist message, delivering live only"
                );
                return (message, false);
            }
        };

        let preview = stored.content.as_str().to_string();
        if let Err(e) = self.store.update_room_preview(room_id, preview).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to update room preview");
        }
        (stored, true)
    }

    async fn publish_notifications(&self, message: &Message) -> (usize, usize) {
        let members = match self.oracle.members_of(message.room_id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(
                    room_id = %message.room_id,
                    error = %e,
                    "failed to resolve room members, skipping notifications"
                );
                return (0, 0);
            }
        };

        let mut notified = 0;
        let mut failures = 0;
        for member in members {
            let notification = Notification::for_recipient(message, member.user_id);
            match self.publisher.publish(member.user_id, &notification).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        room_id = %message.room_id,
                        recipient = %member.user_id,
                        error = %e,
                        "failed to publish notification"
                    );
                }
            }
        }
        (notified, failures)
    }
}
