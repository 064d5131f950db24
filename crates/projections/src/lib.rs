//! Latest-state projections and temporal queries over append-only event logs.
//!
//! This crate answers "what is the current state of each entity, and which
//! entities satisfy a time-relative condition":
//! - [`project`] collapses a log into the latest event per entity
//! - [`temporal`] evaluates elapsed-time and expiry predicates against an
//!   injected `now`
//! - [`join_on`] inner-joins two projections
//! - [`find_stale`] and [`find_expiring_joined`] compose those into the two
//!   supported query shapes
//! - [`LifecycleQueries`] sources the logs from an [`event_store::EventStore`]

pub mod error;
pub mod expiry;
pub mod join;
pub mod projector;
pub mod queries;
pub mod service;
pub mod temporal;

pub use error::{ProjectionError, Result};
pub use expiry::ExpiryDescriptor;
pub use join::{JoinKey, JoinedRecord, join, join_on};
pub use projector::{Projection, project, project_filtered};
pub use queries::{
    DEFAULT_EXPIRY_FIELD, ExpiringQuery, ExpiringRecord, ExpiringReport, ExpiryRejection,
    find_expiring_joined, find_expiring_joined_with, find_stale,
};
pub use service::{LifecycleQueries, QueryPolicy};
pub use temporal::{TemporalPredicate, TimeWindow, evaluate, expires_within, is_stale};
