//! Socket session plumbing shared by room and notification sockets.

use std::{sync::Arc, time::Duration};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures_util::{Sink, SinkExt};
use tokio::task::{AbortHandle, JoinHandle};

use crate::{
    domain::{ConnectionId, Outbox, OutboxEvent, RoomId, UserId},
    usecase::DisconnectSessionUseCase,
};

/// Outbox の中身をソケットへ書き出すタスクを起動
///
/// 1 回の書き込みは `write_timeout` で打ち切る。書き込みが遅い・失敗した場合は
/// タスクが終わり、セッションも終わる。close 要求は理由のコード付きの Close
/// フレームとして送る。
///
/// # Arguments
///
/// * `outbox` - 接続の受信側
/// * `sender` - ソケットの書き込み側 (`SplitSink<WebSocket, Message>` など)
/// * `write_timeout` - 1 回の書き込みの上限
pub fn pusher_loop<S>(mut outbox: Outbox, mut sender: S, write_timeout: Duration) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: std::fmt::Display + Send,
{
    tokio::spawn(async move {
        loop {
            match outbox.next_event().await {
                OutboxEvent::Frame(frame) => {
                    match tokio::time::timeout(write_timeout, sender.send(Message::Text(frame.into())))
                        .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(error = %e, "socket write failed");
                            break;
                        }
                        Err(_) => {
                            tracing::warn!(timeout = ?write_timeout, "socket write timed out");
                            break;
                        }
                    }
                }
                OutboxEvent::Close(reason) => {
                    let frame = CloseFrame {
                        code: reason.code(),
                        reason: Utf8Bytes::from_static(reason.description()),
                    };
                    match tokio::time::timeout(write_timeout, sender.send(Message::Close(Some(frame))))
                        .await
                    {
                        Ok(Ok(())) => tracing::debug!(reason = ?reason, "socket closed by server"),
                        Ok(Err(e)) => tracing::debug!(error = %e, "close frame not sent"),
                        Err(_) => tracing::debug!("close frame timed out"),
                    }
                    break;
                }
                OutboxEvent::Drained => break,
            }
        }
    })
}

/// 読み込みタスクと書き込みタスクのどちらかが終わるまで待ち、セッションを片付ける
///
/// 書き込みがタイムアウトした読まないクライアントも、ここで Registry から外れる。
pub async fn supervise(
    mut guard: SessionGuard,
    mut recv_task: JoinHandle<()>,
    mut send_task: JoinHandle<()>,
) {
    guard.track(&recv_task);
    guard.track(&send_task);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => {},
        _ = &mut send_task => {},
    };

    guard.release().await;
}

/// セッション終了時に解除すべき Registry のエントリ
#[derive(Debug, Clone, Copy)]
pub enum SessionTarget {
    Room {
        room_id: RoomId,
        connection_id: ConnectionId,
    },
    Notifications {
        user_id: UserId,
        connection_id: ConnectionId,
    },
}

impl SessionTarget {
    async fn unregister(self, disconnect: &DisconnectSessionUseCase) {
        match self {
            SessionTarget::Room {
                room_id,
                connection_id,
            } => {
                disconnect.leave_room(room_id, connection_id).await;
            }
            SessionTarget::Notifications {
                user_id,
                connection_id,
            } => {
                disconnect.detach_notifications(user_id, connection_id).await;
            }
        }
    }
}

/// どの終了経路でもセッションの後片付けを 1 回だけ行う
///
/// 通常は [`SessionGuard::release`] で片付ける。呼ばずに破棄された場合 (タスクの
/// panic やキャンセル) は、追跡中のタスクを abort し、登録解除をランタイムに spawn する。
pub struct SessionGuard {
    disconnect: Arc<DisconnectSessionUseCase>,
    target: SessionTarget,
    tasks: Vec<AbortHandle>,
    released: bool,
}

impl SessionGuard {
    pub fn new(disconnect: Arc<DisconnectSessionUseCase>, target: SessionTarget) -> Self {
        Self {
            disconnect,
            target,
            tasks: Vec::new(),
            released: false,
        }
    }

    /// セッション終了時に `task` を abort する
    pub fn track<T>(&mut self, task: &JoinHandle<T>) {
        self.tasks.push(task.abort_handle());
    }

    pub async fn release(mut self) {
        self.released = true;
        self.abort_tasks();
        self.target.unregister(&self.disconnect).await;
    }

    fn abort_tasks(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.abort_tasks();
        let disconnect = self.disconnect.clone();
        let target = self.target;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { target.unregister(&disconnect).await });
            }
            Err(_) => tracing::error!(session = ?target, "session dropped outside the runtime"),
        }
    }
}
