//! Shared types used across the event log query crates.

pub mod types;

pub use types::EntityId;
