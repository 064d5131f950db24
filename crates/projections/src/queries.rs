//! The two supported query shapes, as pure functions over log snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use common::EntityId;
use event_store::{Event, EventRecord};
use serde::Serialize;

use crate::expiry::ExpiryDescriptor;
use crate::join::{JoinKey, JoinedRecord, join_on};
use crate::projector::{project, project_filtered};
use crate::temporal::{TimeWindow, expires_within, is_stale};
use crate::{ProjectionError, Result};

/// Metadata field holding the `MM/YY` descriptor unless configured otherwise.
pub const DEFAULT_EXPIRY_FIELD: &str = "valid_until";

/// Finds entities whose latest event is `event_type` and older than
/// `staleness`.
///
/// The log is projected before filtering by type, so a later event of any
/// other type (e.g. a `return` after a `borrow`) removes the entity.
/// Results are sorted by entity id.
pub fn find_stale(
    log: &[EventRecord],
    event_type: &str,
    now: DateTime<Utc>,
    staleness: TimeWindow,
) -> Result<Vec<Event>> {
    let stale: Vec<Event> = project(log)?
        .filter_event_type(event_type)
        .into_events()
        .into_iter()
        .filter(|event| is_stale(event, now, staleness))
        .collect();

    tracing::debug!(event_type, %staleness, matches = stale.len(), "stale entities found");
    Ok(stale)
}

/// Parameters of an expiring-join query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringQuery {
    /// Type the primary entity's latest event must have.
    pub primary_type: String,
    /// Type of the secondary events carrying the expiry descriptor.
    pub secondary_type: String,
    /// How primary events find their secondary partner.
    pub join_key: JoinKey,
    /// Metadata field of the secondary event holding the descriptor.
    pub expiry_field: String,
    /// How far ahead of `now` an expiry counts as upcoming.
    pub lead_time: TimeWindow,
}

impl ExpiringQuery {
    /// Creates a query joining on entity id and reading
    /// [`DEFAULT_EXPIRY_FIELD`].
    pub fn new(
        primary_type: impl Into<String>,
        secondary_type: impl Into<String>,
        lead_time: TimeWindow,
    ) -> Self {
        Self {
            primary_type: primary_type.into(),
            secondary_type: secondary_type.into(),
            join_key: JoinKey::EntityId,
            expiry_field: DEFAULT_EXPIRY_FIELD.to_string(),
            lead_time,
        }
    }

    /// Sets the join key.
    pub fn join_key(mut self, join_key: JoinKey) -> Self {
        self.join_key = join_key;
        self
    }

    /// Sets the metadata field holding the descriptor.
    pub fn expiry_field(mut self, field: impl Into<String>) -> Self {
        self.expiry_field = field.into();
        self
    }
}

/// A joined record whose secondary side expires within the lead time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiringRecord {
    #[serde(flatten)]
    pub record: JoinedRecord,
    pub valid_until: ExpiryDescriptor,
}

impl ExpiringRecord {
    /// Last day the secondary side is valid.
    pub fn expires_on(&self) -> NaiveDate {
        self.valid_until.end_of_month()
    }
}

/// A secondary entity skipped because its descriptor could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryRejection {
    pub entity_id: EntityId,
    pub value: String,
    pub reason: String,
}

/// Result of an expiring-join query.
///
/// Malformed descriptors do not fail the query; they are listed in
/// `rejected` and the remaining matches are still returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpiringReport {
    pub records: Vec<ExpiringRecord>,
    pub rejected: Vec<ExpiryRejection>,
}

/// Finds primary entities in `event_type_a` state whose partner in `log_b`
/// has an `event_type_b` descriptor expiring within `lead_time`, joining on
/// entity id.
pub fn find_expiring_joined(
    log_a: &[EventRecord],
    event_type_a: &str,
    log_b: &[EventRecord],
    event_type_b: &str,
    now: DateTime<Utc>,
    lead_time: TimeWindow,
) -> Result<ExpiringReport> {
    let query = ExpiringQuery::new(event_type_a, event_type_b, lead_time);
    find_expiring_joined_with(log_a, log_b, &query, now)
}

/// General form of [`find_expiring_joined`].
///
/// The primary log is projected and then filtered by type (only entities
/// *currently* in that state). The secondary log is filtered by type and
/// by presence of metadata and then projected, giving each entity's latest
/// event of that type even if later events of other types exist.
pub fn find_expiring_joined_with(
    log_a: &[EventRecord],
    log_b: &[EventRecord],
    query: &ExpiringQuery,
    now: DateTime<Utc>,
) -> Result<ExpiringReport> {
    let primary = project(log_a)?.filter_event_type(&query.primary_type);
    let secondary = project_filtered(log_b, |record| {
        record.event_type == query.secondary_type && record.metadata.is_some()
    })?;

    let mut descriptors: BTreeMap<EntityId, Option<ExpiryDescriptor>> = BTreeMap::new();
    let mut report = ExpiringReport::default();

    for joined in join_on(&primary, &secondary, &query.join_key) {
        let descriptor = *descriptors.entry(joined.key.clone()).or_insert_with(|| {
            match ExpiryDescriptor::from_metadata(&joined.secondary, &query.expiry_field) {
                Ok(descriptor) => Some(descriptor),
                Err(err) => {
                    report.rejected.push(rejection(&joined.key, err));
                    None
                }
            }
        });

        if let Some(valid_until) = descriptor
            && expires_within(&valid_until, now, query.lead_time)
        {
            report.records.push(ExpiringRecord {
                record: joined,
                valid_until,
            });
        }
    }

    tracing::debug!(
        primary_type = %query.primary_type,
        secondary_type = %query.secondary_type,
        lead_time = %query.lead_time,
        matches = report.records.len(),
        rejected = report.rejected.len(),
        "expiring records found"
    );

    Ok(report)
}

fn rejection(entity_id: &EntityId, err: ProjectionError) -> ExpiryRejection {
    tracing::warn!(%entity_id, error = %err, "skipping record with invalid expiry descriptor");
    metrics::counter!("projections_expiry_rejections").increment(1);

    match err {
        ProjectionError::InvalidExpiryFormat { value, reason } => ExpiryRejection {
            entity_id: entity_id.clone(),
            value,
            reason,
        },
        other => ExpiryRejection {
            entity_id: entity_id.clone(),
            value: String::new(),
            reason: other.to_string(),
        },
    }
}
