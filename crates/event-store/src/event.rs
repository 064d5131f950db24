use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Structured key-value payload attached to an event.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A raw row read from an event log.
///
/// Fields that are nullable in storage are optional here. A record is only
/// usable by the query core once it has been validated into an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The entity this event belongs to (transaction id, user id, ...).
    pub entity_id: Option<EntityId>,

    /// The type of the event (e.g., "borrow", "return", "add-payment-method").
    pub event_type: String,

    /// When the event occurred.
    pub occurred_at: Option<DateTime<Utc>>,

    /// Optional structured payload.
    pub metadata: Option<Metadata>,

    /// Other identifier columns carried by the row, keyed by column name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl EventRecord {
    /// Creates a new event record builder.
    pub fn builder() -> EventRecordBuilder {
        EventRecordBuilder::default()
    }
}

/// Builder for constructing event records.
#[derive(Debug, Default)]
pub struct EventRecordBuilder {
    entity_id: Option<EntityId>,
    event_type: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    metadata: Option<Metadata>,
    attributes: BTreeMap<String, String>,
}

impl EventRecordBuilder {
    /// Sets the entity ID.
    pub fn entity_id(mut self, id: impl Into<EntityId>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the time the event occurred.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Adds a metadata entry, creating the payload if needed.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Replaces the whole metadata payload.
    pub fn metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adds an identifier attribute (e.g., `user_id` on a product event).
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builds the event record.
    ///
    /// # Panics
    ///
    /// Panics if `event_type` is not set. Entity ID and timestamp may be
    /// left unset to model rows with null columns.
    pub fn build(self) -> EventRecord {
        EventRecord {
            entity_id: self.entity_id,
            event_type: self.event_type.expect("event_type is required"),
            occurred_at: self.occurred_at,
            metadata: self.metadata,
            attributes: self.attributes,
        }
    }
}

/// Why a record could not be validated into an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// Zero-based position of the record in its log.
    pub position: usize,
    pub reason: String,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record #{}: {}", self.position, self.reason)
    }
}

impl std::error::Error for MalformedRecord {}

/// A validated event: it has a key and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub entity_id: EntityId,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Event {
    /// Validates a record taken from `position` in its log.
    pub fn try_from_record(
        record: EventRecord,
        position: usize,
    ) -> std::result::Result<Self, MalformedRecord> {
        let entity_id = match record.entity_id {
            Some(id) if !id.is_blank() => id,
            Some(_) => {
                return Err(MalformedRecord {
                    position,
                    reason: "entity_id is blank".to_string(),
                });
            }
            None => {
                return Err(MalformedRecord {
                    position,
                    reason: "entity_id is missing".to_string(),
                });
            }
        };

        let occurred_at = record.occurred_at.ok_or_else(|| MalformedRecord {
            position,
            reason: format!("occurred_at is missing for entity {entity_id}"),
        })?;

        Ok(Self {
            entity_id,
            event_type: record.event_type,
            occurred_at,
            metadata: record.metadata,
            attributes: record.attributes,
        })
    }

    /// Returns true if this event has the given type.
    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    /// Looks up a metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.as_ref()?.get(key)
    }

    /// Looks up an identifier attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
