use thiserror::Error;

/// Errors that can occur when reading from an event log.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store could not be reached.
    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

impl EventStoreError {
    /// Returns true if retrying the same read may succeed.
    ///
    /// Connection-level failures are transient; decoding and migration
    /// failures will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EventStoreError::Unavailable(_) => true,
            EventStoreError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Tls(_)
            ),
            EventStoreError::Migration(_) | EventStoreError::Serialization(_) => false,
        }
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_retryable() {
        let err = EventStoreError::Unavailable("connection refused".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        let err = EventStoreError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn row_not_found_is_not_retryable() {
        let err = EventStoreError::Database(sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn serialization_is_not_retryable() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!EventStoreError::Serialization(json_err).is_retryable());
    }
}
