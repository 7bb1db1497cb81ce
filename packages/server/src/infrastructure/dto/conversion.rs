//! Conversion logic between domain entities and DTOs.

use dengon_shared::time::millis_to_jst_rfc3339;

use crate::domain::{Message, Notification, RegistrySnapshot};
use crate::infrastructure::dto::{
    http::{RegistrySnapshotDto, RoomConnectionsDto},
    websocket::{MessageFrame, NotificationFrame},
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Message> for MessageFrame {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.map(|id| id.value()),
            room_id: message.room_id.to_string(),
            sender_id: message.sender_id.value(),
            sender: message.sender_name.as_str().to_string(),
            content: message.content.as_str().to_string(),
            created_at: millis_to_jst_rfc3339(message.created_at.value()),
        }
    }
}

impl From<&Notification> for NotificationFrame {
    fn from(notification: &Notification) -> Self {
        let content = notification.content.as_str().to_string();
        Self {
            room_id: notification.room_id.to_string(),
            sender_id: notification.sender_id.value(),
            sender: notification.sender_name.as_str().to_string(),
            last_message: content.clone(),
            content,
            created_at: millis_to_jst_rfc3339(notification.created_at.value()),
            from_self: notification.from_self,
        }
    }
}

impl From<RegistrySnapshot> for RegistrySnapshotDto {
    fn from(snapshot: RegistrySnapshot) -> Self {
        Self {
            rooms: snapshot
                .rooms
                .into_iter()
                .map(|(room_id, connections)| RoomConnectionsDto {
                    room_id: room_id.to_string(),
                    connections,
                })
                .collect(),
            notification_users: snapshot.users.iter().map(|id| id.value()).collect(),
        }
    }
}
