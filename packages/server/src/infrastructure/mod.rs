//! Infrastructure layer: concrete implementations of the domain interfaces.

pub mod auth;
pub mod broker;
pub mod dto;
pub mod notifier;
pub mod registry;
pub mod repository;
