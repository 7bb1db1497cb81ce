//! Repository implementations.
//!
//! - `inmemory`: membership oracle and message store kept in process memory
//! - `seed`: JSON seed file describing rooms and their members

pub mod inmemory;
pub mod seed;

pub use inmemory::{InMemoryMembershipOracle, InMemoryMessageStore};
pub use seed::{SeedData, SeedError};
