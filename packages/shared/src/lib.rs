//! Utilities shared by the Dengon relay binaries and tests.

pub mod logger;
pub mod time;
