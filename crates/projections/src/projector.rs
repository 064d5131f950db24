//! Latest-state projector: one current event per entity.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use common::EntityId;
use event_store::{Event, EventRecord};

use crate::Result;

/// The latest known event of every entity in a log.
///
/// Keyed by [`EntityId`], so iteration is always in key order regardless of
/// the order events arrived in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    latest: BTreeMap<EntityId, Event>,
}

impl Projection {
    /// Creates an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects already-validated events given in arrival order.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut projection = Self::new();
        for event in events {
            projection.apply(event);
        }
        projection
    }

    /// Folds one event into the projection.
    ///
    /// An event replaces the current one when its timestamp is greater or
    /// equal, so on equal timestamps the later arrival wins.
    fn apply(&mut self, event: Event) {
        match self.latest.entry(event.entity_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
            Entry::Occupied(mut slot) => {
                if event.occurred_at >= slot.get().occurred_at {
                    slot.insert(event);
                }
            }
        }
    }

    /// Returns the number of entities in the projection.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Returns true if the projection has no entities.
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Gets the latest event of an entity.
    pub fn get(&self, entity_id: &EntityId) -> Option<&Event> {
        self.latest.get(entity_id)
    }

    /// Returns true if the entity has at least one event.
    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.latest.contains_key(entity_id)
    }

    /// Iterates over `(entity, latest event)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Event)> {
        self.latest.iter()
    }

    /// Iterates over the latest events in key order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.latest.values()
    }

    /// Keeps only entities whose latest event has the given type.
    ///
    /// This filters *after* projection: an entity whose latest event is of
    /// another type is dropped even if it has older events of this type.
    pub fn filter_event_type(mut self, event_type: &str) -> Self {
        self.latest.retain(|_, event| event.is_type(event_type));
        self
    }

    /// Consumes the projection, returning the latest events in key order.
    pub fn into_events(self) -> Vec<Event> {
        self.latest.into_values().collect()
    }
}

/// Projects a log into the latest event per entity.
///
/// Records are validated in arrival order; the first record without a key or
/// timestamp aborts the projection with [`ProjectionError::MalformedEvent`].
///
/// [`ProjectionError::MalformedEvent`]: crate::ProjectionError::MalformedEvent
pub fn project(log: &[EventRecord]) -> Result<Projection> {
    project_filtered(log, |_| true)
}

/// Projects only the records accepted by `keep`.
///
/// Filtering happens *before* projection, so the result holds the latest
/// matching event of each entity. Records rejected by `keep` are not
/// validated. Reported positions refer to the unfiltered log.
pub fn project_filtered<F>(log: &[EventRecord], keep: F) -> Result<Projection>
where
    F: Fn(&EventRecord) -> bool,
{
    let mut projection = Projection::new();
    let mut projected = 0u64;

    for (position, record) in log.iter().enumerate() {
        if !keep(record) {
            continue;
        }
        let event = Event::try_from_record(record.clone(), position)?;
        projection.apply(event);
        projected += 1;
    }

    tracing::debug!(rows = log.len(), projected, entities = projection.len(), "log projected");
    metrics::counter!("projections_events_projected").increment(projected);

    Ok(projection)
}
