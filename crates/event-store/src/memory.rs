use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventRecord, LogQuery, Result, StreamName,
    store::{EventStore, EventStream, matches_query},
};

/// In-memory event store implementation for testing and local runs.
///
/// Each stream is a `Vec` in arrival order; appending never reorders
/// existing rows.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    logs: Arc<RwLock<HashMap<StreamName, Vec<EventRecord>>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to the end of a log.
    pub async fn append(&self, stream: StreamName, record: EventRecord) {
        self.logs
            .write()
            .await
            .entry(stream)
            .or_default()
            .push(record);
    }

    /// Appends records to the end of a log, preserving their order.
    pub async fn append_all(&self, stream: StreamName, records: impl IntoIterator<Item = EventRecord>) {
        self.logs
            .write()
            .await
            .entry(stream)
            .or_default()
            .extend(records);
    }

    /// Returns the number of records in a log.
    pub async fn event_count(&self, stream: StreamName) -> usize {
        self.logs.read().await.get(&stream).map_or(0, Vec::len)
    }

    /// Clears all logs.
    pub async fn clear(&self) {
        self.logs.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn stream_log(&self, query: LogQuery) -> Result<EventStream> {
        use futures_util::stream;

        let logs = self.logs.read().await;
        let records: Vec<EventRecord> = logs
            .get(&query.stream)
            .map(|log| {
                log.iter()
                    .filter(|record| matches_query(record, &query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let stream = stream::iter(records.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_record(entity_id: &str, event_type: &str, day: u32) -> EventRecord {
        EventRecord::builder()
            .entity_id(entity_id)
            .event_type(event_type)
            .occurred_at(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
            .build()
    }

    #[tokio::test]
    async fn append_and_read_preserves_arrival_order() {
        let store = InMemoryEventStore::new();
        store
            .append(StreamName::ProductEvents, create_test_record("T1", "borrow", 5))
            .await;
        store
            .append(StreamName::ProductEvents, create_test_record("T1", "return", 2))
            .await;
        store
            .append(StreamName::ProductEvents, create_test_record("T2", "borrow", 3))
            .await;

        let records = store
            .read_log(LogQuery::all(StreamName::ProductEvents))
            .await
            .unwrap();
        let types: Vec<_> = records.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["borrow", "return", "borrow"]);
    }

    #[tokio::test]
    async fn streams_are_independent() {
        let store = InMemoryEventStore::new();
        store
            .append(StreamName::ProductEvents, create_test_record("T1", "borrow", 1))
            .await;
        store
            .append(StreamName::UserEvents, create_test_record("U1", "signup", 1))
            .await;

        assert_eq!(store.event_count(StreamName::ProductEvents).await, 1);
        assert_eq!(store.event_count(StreamName::UserEvents).await, 1);

        let users = store
            .read_log(LogQuery::all(StreamName::UserEvents))
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].event_type, "signup");
    }

    #[tokio::test]
    async fn empty_stream_reads_empty() {
        let store = InMemoryEventStore::new();
        let records = store
            .read_log(LogQuery::all(StreamName::UserEvents))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn read_with_filters() {
        let store = InMemoryEventStore::new();
        let with_meta = EventRecord::builder()
            .entity_id("U1")
            .event_type("add-payment-method")
            .occurred_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .metadata("valid_until", serde_json::json!("02/25"))
            .build();
        store
            .append_all(
                StreamName::UserEvents,
                vec![
                    create_test_record("U1", "add-payment-method", 1),
                    with_meta,
                    create_test_record("U2", "signup", 2),
                ],
            )
            .await;

        let query = LogQuery::all(StreamName::UserEvents)
            .event_type("add-payment-method")
            .with_metadata();
        let records = store.read_log(query).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].metadata.is_some());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryEventStore::new();
        store
            .append(StreamName::ProductEvents, create_test_record("T1", "borrow", 1))
            .await;
        store.clear().await;
        assert_eq!(store.event_count(StreamName::ProductEvents).await, 0);
    }
}
