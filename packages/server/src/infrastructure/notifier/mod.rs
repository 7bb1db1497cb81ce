//! Notification publisher implementations.
//!
//! - `broker`: publishes encoded notification frames on `user:{id}` topics

pub mod broker;

pub use broker::BrokerNotificationPublisher;
