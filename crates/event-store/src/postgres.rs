use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgConnectOptions, PgRow},
};

use crate::{
    EntityId, EventRecord, EventStoreError, LogQuery, Result, StreamName,
    store::{EventStore, EventStream},
};

/// Table and column names of one event log.
///
/// Both logs share `id`, `evt_type` and `meta` columns but name their key
/// and timestamp columns differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSchema {
    pub table: &'static str,
    pub key_column: &'static str,
    pub timestamp_column: &'static str,
    /// Extra identifier columns copied into [`EventRecord::attributes`].
    pub attribute_columns: &'static [&'static str],
}

impl LogSchema {
    /// Returns the layout of the given stream.
    pub fn for_stream(stream: StreamName) -> Self {
        match stream {
            StreamName::ProductEvents => Self {
                table: "product_events",
                key_column: "transaction_id",
                timestamp_column: "evt_date",
                attribute_columns: &["product_id", "user_id"],
            },
            StreamName::UserEvents => Self {
                table: "user_events",
                key_column: "user_id",
                timestamp_column: "created",
                attribute_columns: &[],
            },
        }
    }

    /// Builds the SELECT statement for a query against this log.
    ///
    /// Rows come back in `id` order, which is the order they were appended.
    pub fn select_sql(&self, query: &LogQuery) -> String {
        let mut sql = format!(
            "SELECT id, {key} AS entity_id, evt_type, {ts} AS occurred_at, meta::jsonb AS metadata",
            key = self.key_column,
            ts = self.timestamp_column,
        );
        for column in self.attribute_columns {
            sql.push_str(&format!(", {column}"));
        }
        sql.push_str(&format!(" FROM {} WHERE 1=1", self.table));

        if query.event_type.is_some() {
            sql.push_str(" AND evt_type = $1");
        }
        if query.require_metadata {
            sql.push_str(" AND meta IS NOT NULL");
        }

        sql.push_str(" ORDER BY id ASC");
        sql
    }

    /// Builds the INSERT statement for appending a row to this log.
    pub fn insert_sql(&self) -> String {
        let mut columns = vec![self.key_column, "evt_type", self.timestamp_column, "meta"];
        columns.extend_from_slice(self.attribute_columns);

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn row_to_record(&self, row: &PgRow) -> Result<EventRecord> {
        let metadata = match row.try_get::<Option<serde_json::Value>, _>("metadata")? {
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => {
                let id: i64 = row.try_get("id")?;
                tracing::warn!(
                    table = self.table,
                    id,
                    kind = json_kind(&other),
                    "ignoring non-object metadata"
                );
                None
            }
        };

        let mut attributes = BTreeMap::new();
        for column in self.attribute_columns {
            if let Some(value) = row.try_get::<Option<String>, _>(*column)? {
                attributes.insert((*column).to_string(), value);
            }
        }

        Ok(EventRecord {
            entity_id: row
                .try_get::<Option<String>, _>("entity_id")?
                .map(EntityId::new),
            event_type: row.try_get("evt_type")?,
            occurred_at: row.try_get::<Option<DateTime<Utc>>, _>("occurred_at")?,
            metadata,
            attributes,
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Connects with discrete connection options, so credentials need no
    /// URL escaping.
    pub async fn connect_with(options: PgConnectOptions) -> Result<Self> {
        let pool = PgPool::connect_with(options)
            .await
            .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Appends a row to a log.
    pub async fn append(&self, stream: StreamName, record: &EventRecord) -> Result<()> {
        let schema = LogSchema::for_stream(stream);
        let sql = schema.insert_sql();
        let metadata = record
            .metadata
            .clone()
            .map(serde_json::Value::Object);

        let mut insert = sqlx::query(&sql)
            .bind(record.entity_id.as_ref().map(|id| id.as_str().to_string()))
            .bind(&record.event_type)
            .bind(record.occurred_at)
            .bind(metadata);
        for column in schema.attribute_columns {
            insert = insert.bind(record.attributes.get(*column).cloned());
        }

        insert.execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self), fields(stream = %query.stream))]
    async fn stream_log(&self, query: LogQuery) -> Result<EventStream> {
        use futures_util::stream;

        let schema = LogSchema::for_stream(query.stream);
        let sql = schema.select_sql(&query);

        let mut select = sqlx::query(&sql);
        if let Some(ref event_type) = query.event_type {
            select = select.bind(event_type);
        }

        // One statement, so the rows form a consistent snapshot of the log.
        let rows = select.fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(|row| schema.row_to_record(row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::pin(stream::iter(records.into_iter().map(Ok))))
    }
}
