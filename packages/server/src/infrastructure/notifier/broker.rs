//! Broker を使う NotificationPublisher 実装

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{Broker, BrokerError, Notification, NotificationPublisher, Topic, UserId},
    infrastructure::dto::websocket::NotificationFrame,
};

/// [`Notification`] を [`NotificationFrame`] にエンコードし、受信者のトピックに 1 回 publish する
pub struct BrokerNotificationPublisher {
    broker: Arc<dyn Broker>,
}

impl BrokerNotificationPublisher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl NotificationPublisher for BrokerNotificationPublisher {
    async fn publish(
        &self,
        recipient: UserId,
        notification: &Notification,
    ) -> Result<(), BrokerError> {
        let topic = Topic::user(recipient);
        let payload = serde_json::to_vec(&NotificationFrame::from(notification)).map_err(|e| {
            BrokerError::Encode {
                topic: topic.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.broker.publish(&topic, payload).await
    }
}
