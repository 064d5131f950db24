use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;

use crate::{EventRecord, LogQuery, Result};

/// A stream of log rows.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord>> + Send>>;

/// Read-only access to append-only event logs.
///
/// Implementations return a consistent snapshot of the requested log in
/// arrival order. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Streams the rows of a log matching the query.
    ///
    /// Rows are yielded in arrival (insertion) order.
    async fn stream_log(&self, query: LogQuery) -> Result<EventStream>;

    /// Reads the full set of rows matching the query, in arrival order.
    async fn read_log(&self, query: LogQuery) -> Result<Vec<EventRecord>> {
        let stream = query.stream;
        let records: Vec<EventRecord> = self.stream_log(query).await?.try_collect().await?;
        tracing::debug!(%stream, rows = records.len(), "log read");
        metrics::counter!("event_store_rows_read", "stream" => stream.as_str())
            .increment(records.len() as u64);
        Ok(records)
    }
}

/// Returns true if a record passes the pre-projection filters of a query.
pub fn matches_query(record: &EventRecord, query: &LogQuery) -> bool {
    if let Some(ref event_type) = query.event_type
        && &record.event_type != event_type
    {
        return false;
    }
    if query.require_metadata && record.metadata.is_none() {
        return false;
    }
    true
}
