//! Inner join of two projections.

use common::EntityId;
use event_store::Event;
use serde::Serialize;

use crate::projector::Projection;

/// How a primary event finds its partner in the secondary projection.
///
/// The secondary side is always looked up by its own entity id, which a
/// projection guarantees to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JoinKey {
    /// Both projections are keyed by the same entity id.
    #[default]
    EntityId,
    /// The primary event names its partner in an identifier attribute
    /// (e.g. a product transaction carries the borrowing `user_id`).
    Attribute(String),
}

impl JoinKey {
    /// Shorthand for [`JoinKey::Attribute`].
    pub fn attribute(name: impl Into<String>) -> Self {
        JoinKey::Attribute(name.into())
    }

    fn resolve(&self, event: &Event) -> Option<EntityId> {
        match self {
            JoinKey::EntityId => Some(event.entity_id.clone()),
            JoinKey::Attribute(name) => event.attribute(name).map(EntityId::from),
        }
    }
}

/// A primary event paired with the secondary event sharing its key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    /// The key both sides matched on.
    pub key: EntityId,
    pub primary: Event,
    pub secondary: Event,
}

/// Joins two projections on entity id.
pub fn join(primary: &Projection, secondary: &Projection) -> Vec<JoinedRecord> {
    join_on(primary, secondary, &JoinKey::EntityId)
}

/// Joins two projections, resolving each primary event's key with `key`.
///
/// Inner-join semantics: a primary event appears in the output only if its
/// key resolves and the secondary projection has an entry for it. Output is
/// sorted by join key, then by the primary entity id.
pub fn join_on(primary: &Projection, secondary: &Projection, key: &JoinKey) -> Vec<JoinedRecord> {
    let mut joined: Vec<JoinedRecord> = primary
        .events()
        .filter_map(|event| {
            let join_key = key.resolve(event)?;
            let partner = secondary.get(&join_key)?;
            Some(JoinedRecord {
                key: join_key,
                primary: event.clone(),
                secondary: partner.clone(),
            })
        })
        .collect();

    joined.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.primary.entity_id.cmp(&b.primary.entity_id))
    });

    tracing::debug!(
        primary = primary.len(),
        secondary = secondary.len(),
        joined = joined.len(),
        "projections joined"
    );

    joined
}
