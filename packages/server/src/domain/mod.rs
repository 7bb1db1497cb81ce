//! Domain layer for the chat relay.
//!
//! Value objects, entities and the interfaces of every collaborator the relay
//! talks to. Nothing in here depends on axum or on a concrete store.

pub mod auth;
pub mod broker;
pub mod codec;
pub mod connection;
pub mod entity;
pub mod error;
pub mod notifier;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use auth::TokenVerifier;
pub use broker::{Broker, PayloadStream};
pub use codec::FrameEncoder;
pub use connection::{CloseReason, ConnectionHandle, Outbox, OutboxEvent, open_connection};
pub use entity::{Identity, Member, Message, Notification};
pub use error::{
    AuthError, BrokerError, DeliveryError, EncodeError, StoreError, ValueObjectError,
};
pub use notifier::NotificationPublisher;
pub use registry::{BroadcastReport, ConnectionRegistry, RegistrySnapshot};
pub use repository::{MembershipOracle, MessageStore};
pub use value_object::{
    ConnectionId, DisplayName, MAX_MESSAGE_CHARS, MessageContent, MessageId, RoomId, Timestamp,
    Topic, UserId,
};

#[cfg(test)]
pub use auth::MockTokenVerifier;
#[cfg(test)]
pub use codec::MockFrameEncoder;
#[cfg(test)]
pub use notifier::MockNotificationPublisher;
#[cfg(test)]
pub use repository::{MockMembershipOracle, MockMessageStore};
