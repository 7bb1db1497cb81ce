//! dengon: real-time chat relay.
//!
//! Room sockets exchange messages that are persisted and then fanned out to
//! every live socket in the room, while per-user notification sockets receive
//! cross-room alerts bridged through a publish/subscribe broker.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
