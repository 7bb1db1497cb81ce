//! Data Transfer Objects for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: frames written to room and notification sockets
//! - `http`: HTTP API response bodies
//!
//! `encoder` writes domain messages as `websocket` frames.

pub mod conversion;
pub mod encoder;
pub mod http;
pub mod websocket;

pub use encoder::JsonFrameEncoder;
