//! Request handlers.

mod http;
mod notification_socket;
mod rejection;
mod room_socket;
mod session;

pub use http::{debug_registry, health_check};
pub use notification_socket::notification_socket_handler;
pub use room_socket::room_socket_handler;
