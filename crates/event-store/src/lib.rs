pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::EntityId;
pub use error::{EventStoreError, Result};
pub use event::{Event, EventRecord, EventRecordBuilder, MalformedRecord, Metadata};
pub use memory::InMemoryEventStore;
pub use postgres::{LogSchema, PostgresEventStore};
pub use query::{LogQuery, StreamName};
pub use store::{EventStore, EventStream};
