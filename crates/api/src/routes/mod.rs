//! HTTP route handlers.

pub mod health;
pub mod lending;
pub mod metrics;
