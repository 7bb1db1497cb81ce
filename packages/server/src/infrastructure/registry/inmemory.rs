//! InMemory Connection Registry 実装
//!
//! ルーム ID からライブソケットへのマップと、ユーザー ID から通知ソケットへの
//! マップを、それぞれ別の Mutex で持つ。フレームの投入はブロックしない
//! ([`ConnectionHandle::deliver`] 参照) ので、ブロードキャスト中にルームのロックを
//! 持つのはルーム内ソケット数に比例する時間だけ。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    BroadcastReport, CloseReason, ConnectionHandle, ConnectionId, ConnectionRegistry,
    DeliveryError, DisplayName, RegistrySnapshot, RoomId, UserId,
};

/// ルームのライブソケット 1 本
#[derive(Debug)]
struct RoomSession {
    connection: ConnectionHandle,
    display_name: DisplayName,
}

#[derive(Debug, Default)]
pub struct InMemoryConnectionRegistry {
    rooms: Mutex<HashMap<RoomId, HashMap<ConnectionId, RoomSession>>>,
    users: Mutex<HashMap<UserId, ConnectionHandle>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register_room(
        &self,
        room_id: RoomId,
        connection: ConnectionHandle,
        display_name: DisplayName,
    ) {
        let connection_id = connection.id();
        let mut rooms = self.rooms.lock().await;
        let live = rooms.entry(room_id).or_default();
        live.insert(
            connection_id,
            RoomSession {
                connection,
                display_name,
            },
        );
        tracing::debug!(
            room_id = %room_id,
            connection_id = %connection_id,
            live = live.len(),
            "room socket registered"
        );
    }

    async fn unregister_room(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(live) = rooms.get_mut(&room_id) else {
            return false;
        };
        let removed = live.remove(&connection_id).is_some();
        if live.is_empty() {
            rooms.remove(&room_id);
        }
        if removed {
            tracing::debug!(
                room_id = %room_id,
                connection_id = %connection_id,
                "room socket unregistered"
            );
        }
        removed
    }

    async fn broadcast_room(&self, room_id: RoomId, payload: &str) -> BroadcastReport {
        let mut rooms = self.rooms.lock().await;
        let Some(live) = rooms.get_mut(&room_id) else {
            return BroadcastReport::default();
        };

        let mut report = BroadcastReport::default();
        live.retain(|connection_id, session| {
            match session.connection.deliver(payload.to_string()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        room_id = %room_id,
                        connection_id = %connection_id,
                        user = %session.display_name,
                        error = %e,
                        "evicting room socket after failed delivery"
                    );
                    if e == DeliveryError::Overflow {
                        session.connection.close(CloseReason::SlowConsumer);
                    }
                    report.evicted.push(*connection_id);
                    false
                }
            }
        });
        if live.is_empty() {
            rooms.remove(&room_id);
        }
        report
    }

    async fn register_user(
        &self,
        user_id: UserId,
        connection: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let connection_id = connection.id();
        let previous = self.users.lock().await.insert(user_id, connection);
        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            replaced = previous.is_some(),
            "notification socket registered"
        );
        previous
    }

    async fn unregister_user(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut users = self.users.lock().await;
        match users.get(&user_id) {
            Some(current) if current.id() == connection_id => {
                users.remove(&user_id);
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "notification socket unregistered"
                );
                true
            }
            _ => false,
        }
    }

    async fn snapshot(&self) -> RegistrySnapshot {
        let mut rooms: Vec<(RoomId, usize)> = self
            .rooms
            .lock()
            .await
            .iter()
            .map(|(room_id, live)| (*room_id, live.len()))
            .collect();
        rooms.sort();
        let mut users: Vec<UserId> = self.users.lock().await.keys().copied().collect();
        users.sort();
        RegistrySnapshot { rooms, users }
    }

    async fn close_all(&self, reason: CloseReason) {
        let rooms = self.rooms.lock().await;
        for session in rooms.values().flat_map(HashMap::values) {
            session.connection.close(reason);
        }
        drop(rooms);

        let users = self.users.lock().await;
        for connection in users.values() {
            connection.close(reason);
        }
        tracing::info!(reason = ?reason, "closed all registered sockets");
    }
}
