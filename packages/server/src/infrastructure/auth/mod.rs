//! Token verifier implementations.
//!
//! - `jwt`: HS256 JSON Web Tokens carrying `user_id` and `user_name`
//! - `inmemory`: fixed token table for development and tests

pub mod inmemory;
pub mod jwt;

pub use inmemory::InMemoryTokenVerifier;
pub use jwt::{JwtClaims, JwtTokenVerifier};
