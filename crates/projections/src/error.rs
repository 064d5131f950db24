//! Projection error types.

use event_store::{EventStoreError, MalformedRecord};
use thiserror::Error;

/// Errors that can occur while projecting or querying event logs.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A log row lacks a usable key or timestamp. Aborts the projection.
    #[error("Malformed event at position {position}: {reason}")]
    MalformedEvent { position: usize, reason: String },

    /// An expiry descriptor could not be parsed.
    #[error("Invalid expiry format {value:?}: {reason}")]
    InvalidExpiryFormat { value: String, reason: String },

    /// The event store could not supply a log.
    #[error(transparent)]
    StoreUnavailable(#[from] EventStoreError),
}

impl ProjectionError {
    /// Returns true if the caller may retry the same query.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProjectionError::StoreUnavailable(err) => err.is_retryable(),
            ProjectionError::MalformedEvent { .. }
            | ProjectionError::InvalidExpiryFormat { .. } => false,
        }
    }
}

impl From<MalformedRecord> for ProjectionError {
    fn from(err: MalformedRecord) -> Self {
        ProjectionError::MalformedEvent {
            position: err.position,
            reason: err.reason,
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
