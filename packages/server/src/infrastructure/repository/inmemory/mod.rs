//! InMemory Repository 実装
//!
//! ドメイン層が定義する MembershipOracle / MessageStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。

pub mod membership;
pub mod message;

pub use membership::InMemoryMembershipOracle;
pub use message::InMemoryMessageStore;
