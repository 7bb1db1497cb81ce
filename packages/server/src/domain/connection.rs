//! ライブソケットのハンドル
//!
//! 接続は 2 つに分かれる。[`ConnectionHandle`] は Registry と通知転送タスクに
//! 複製され、ブロックせずにフレームをキューに積み、ソケットの close を要求できる。
//! [`Outbox`] はソケットの書き込みタスクが持ち、キューの中身をワイヤへ流して
//! Close フレームを送る。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::{ConnectionId, DeliveryError};

/// サーバーがソケットを閉じた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 同じユーザーの新しい通知ソケットに置き換えられた
    Replaced,
    /// 相手が読み込みをやめ、送信キューが溢れた
    SlowConsumer,
    /// 通知の購読を張り直せなかった
    BrokerUnavailable,
    ServerShutdown,
}

impl CloseReason {
    /// WebSocket の close コード (RFC 6455 §7.4.1)
    pub fn code(&self) -> u16 {
        match self {
            CloseReason::Replaced => 1000,
            CloseReason::ServerShutdown => 1001,
            CloseReason::SlowConsumer => 1008,
            CloseReason::BrokerUnavailable => 1011,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CloseReason::Replaced => "replaced by a newer connection",
            CloseReason::ServerShutdown => "server shutting down",
            CloseReason::SlowConsumer => "outbound queue overflow",
            CloseReason::BrokerUnavailable => "notification stream unavailable",
        }
    }
}

/// ライブソケットの送信側
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    frames: mpsc::Sender<String>,
    close_signal: Arc<watch::Sender<Option<CloseReason>>>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// 書き込みタスク向けにテキストフレームをキューに積む (ブロックしない)
    pub fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }
        self.frames.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Overflow,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// 書き込みタスクにソケットの close を要求する。最初に指定された理由が優先される
    pub fn close(&self, reason: CloseReason) {
        self.close_signal.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        *self.close_signal.borrow()
    }

    /// close が要求済み、または書き込みタスクがいなくなっていれば true
    pub fn is_closed(&self) -> bool {
        self.close_reason().is_some() || self.frames.is_closed()
    }
}

/// ライブソケットの受信側。ソケットの書き込みタスクが持つ
#[derive(Debug)]
pub struct Outbox {
    pub frames: mpsc::Receiver<String>,
    close_signal: watch::Receiver<Option<CloseReason>>,
}

/// 書き込みタスクが次にすべきこと
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxEvent {
    Frame(String),
    Close(CloseReason),
    /// 全ハンドルが破棄され、キューも空になった
    Drained,
}

impl Outbox {
    /// いずれかのハンドルから close が要求されたら完了する
    ///
    /// close せずに全ハンドルが破棄された場合は完了しない。その場合はフレームの
    /// キューが終わるので、書き込みタスクはそちらで止まる。
    pub async fn closed(&mut self) -> CloseReason {
        wait_closed(&mut self.close_signal).await
    }

    /// 次のフレームか close 要求を待つ。close 要求はキューに残ったフレームより優先する
    pub async fn next_event(&mut self) -> OutboxEvent {
        let Outbox {
            frames,
            close_signal,
        } = self;
        tokio::select! {
            biased;
            reason = wait_closed(close_signal) => OutboxEvent::Close(reason),
            frame = frames.recv() => match frame {
                Some(frame) => OutboxEvent::Frame(frame),
                None => OutboxEvent::Drained,
            },
        }
    }
}

async fn wait_closed(signal: &mut watch::Receiver<Option<CloseReason>>) -> CloseReason {
    let requested = match signal.wait_for(Option::is_some).await {
        Ok(reason) => *reason,
        Err(_) => None,
    };
    match requested {
        Some(reason) => reason,
        None => std::future::pending().await,
    }
}

/// 送信キューが `buffer` フレームの接続を開く
pub fn open_connection(buffer: usize) -> (ConnectionHandle, Outbox) {
    let (frames_tx, frames_rx) = mpsc::channel(buffer.max(1));
    let (close_tx, close_rx) = watch::channel(None);
    let handle = ConnectionHandle {
        id: ConnectionId::generate(),
        frames: frames_tx,
        close_signal: Arc::new(close_tx),
    };
    let outbox = Outbox {
        frames: frames_rx,
        close_signal: close_rx,
    };
    (handle, outbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_queues_frame() {
        // テスト項目: deliver したフレームが Outbox から受信できる
        // given (前提条件):
        let (handle, mut outbox) = open_connection(4);

        // when (操作):
        let result = handle.deliver("hello".to_string());

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(outbox.frames.recv().await, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_deliver_overflow_when_queue_full() {
        // テスト項目: キューが満杯のとき deliver はブロックせず Overflow を返す
        // given (前提条件):
        let (handle, _outbox) = open_connection(1);
        handle.deliver("first".to_string()).unwrap();

        // when (操作):
        let result = handle.deliver("second".to_string());

        // then (期待する結果):
        assert_eq!(result, Err(DeliveryError::Overflow));
    }

    #[tokio::test]
    async fn test_deliver_closed_when_outbox_dropped() {
        // テスト項目: Outbox が破棄された後の deliver は Closed を返す
        // given (前提条件):
        let (handle, outbox) = open_connection(4);
        drop(outbox);

        // when (操作):
        let result = handle.deliver("hello".to_string());

        // then (期待する結果):
        assert_eq!(result, Err(DeliveryError::Closed));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_close_first_reason_wins() {
        // テスト項目: 最初に指定された close 理由が保持される
        // given (前提条件):
        let (handle, mut outbox) = open_connection(4);
        let other = handle.clone();

        // when (操作):
        handle.close(CloseReason::Replaced);
        other.close(CloseReason::ServerShutdown);

        // then (期待する結果):
        assert_eq!(outbox.closed().await, CloseReason::Replaced);
        assert_eq!(other.close_reason(), Some(CloseReason::Replaced));
        assert_eq!(
            handle.deliver("late".to_string()),
            Err(DeliveryError::Closed)
        );
    }

    #[tokio::test]
    async fn test_next_event_prefers_close_over_queued_frames() {
        // テスト項目: close 要求はキューに残ったフレームより先に返る
        // given (前提条件):
        let (handle, mut outbox) = open_connection(4);
        handle.deliver("queued".to_string()).unwrap();

        // when (操作):
        handle.close(CloseReason::SlowConsumer);

        // then (期待する結果):
        assert_eq!(
            outbox.next_event().await,
            OutboxEvent::Close(CloseReason::SlowConsumer)
        );
    }

    #[tokio::test]
    async fn test_next_event_drained_when_handles_dropped() {
        // テスト項目: 全ハンドル破棄後、残りのフレームを返してから Drained になる
        // given (前提条件):
        let (handle, mut outbox) = open_connection(4);
        handle.deliver("last".to_string()).unwrap();

        // when (操作):
        drop(handle);

        // then (期待する結果):
        assert_eq!(
            outbox.next_event().await,
            OutboxEvent::Frame("last".to_string())
        );
        assert_eq!(outbox.next_event().await, OutboxEvent::Drained);
    }

    #[test]
    fn test_close_codes() {
        // テスト項目: close 理由ごとに WebSocket の close コードが決まる
        // given (前提条件):
        let reasons = [
            CloseReason::Replaced,
            CloseReason::ServerShutdown,
            CloseReason::SlowConsumer,
            CloseReason::BrokerUnavailable,
        ];

        // when (操作):
        let codes: Vec<u16> = reasons.iter().map(CloseReason::code).collect();

        // then (期待する結果):
        assert_eq!(codes, vec![1000, 1001, 1008, 1011]);
    }
}
