use serde::{Deserialize, Serialize};

/// The event logs a store exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamName {
    /// Product lifecycle events, keyed by transaction.
    ProductEvents,
    /// User lifecycle events, keyed by user.
    UserEvents,
}

impl StreamName {
    /// Returns the canonical name of the stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::ProductEvents => "product_events",
            StreamName::UserEvents => "user_events",
        }
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes which rows of a log to read.
///
/// Only pre-projection filters belong here; anything that depends on the
/// latest state of an entity must be applied after projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// The log to read.
    pub stream: StreamName,

    /// Keep only rows of this event type.
    pub event_type: Option<String>,

    /// Keep only rows that carry a metadata payload.
    pub require_metadata: bool,
}

impl LogQuery {
    /// Creates a query that reads every row of a log.
    pub fn all(stream: StreamName) -> Self {
        Self {
            stream,
            event_type: None,
            require_metadata: false,
        }
    }

    /// Filters by event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Skips rows whose metadata is null.
    pub fn with_metadata(mut self) -> Self {
        self.require_metadata = true;
        self
    }
}
