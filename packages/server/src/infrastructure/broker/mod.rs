//! Broker implementations.
//!
//! - `memory`: single-process broker on `tokio::sync::broadcast`
//! - `postgres`: cross-process broker on PostgreSQL LISTEN/NOTIFY

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBroker;
pub use postgres::PostgresBroker;
