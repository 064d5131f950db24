//! Store-backed entry points for the lending queries.

use chrono::{DateTime, Utc};
use event_store::{Event, EventStore, LogQuery, StreamName};

use crate::Result;
use crate::join::JoinKey;
use crate::queries::{
    DEFAULT_EXPIRY_FIELD, ExpiringQuery, ExpiringReport, find_expiring_joined_with, find_stale,
};
use crate::temporal::TimeWindow;

/// Event names and thresholds used by [`LifecycleQueries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Product event marking a product as lent out.
    pub borrow_type: String,
    /// User event registering a payment method.
    pub payment_method_type: String,
    /// Metadata field of the payment method holding its `MM/YY` expiry.
    pub expiry_field: String,
    /// Product event attribute naming the borrowing user.
    pub user_attribute: String,
    /// How long a borrow may stand before the product counts as lost.
    pub lost_after: TimeWindow,
    /// How far ahead a payment method expiry is flagged.
    pub payment_lead_time: TimeWindow,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            borrow_type: "borrow".to_string(),
            payment_method_type: "add-payment-method".to_string(),
            expiry_field: DEFAULT_EXPIRY_FIELD.to_string(),
            user_attribute: "user_id".to_string(),
            lost_after: TimeWindow::Months(3),
            payment_lead_time: TimeWindow::Days(30),
        }
    }
}

/// Runs the lending queries against an injected event store.
///
/// Each call reads fresh snapshots of the logs and hands them to the pure
/// query functions; nothing is cached between calls.
#[derive(Clone)]
pub struct LifecycleQueries<S: EventStore> {
    store: S,
    policy: QueryPolicy,
}

impl<S: EventStore> LifecycleQueries<S> {
    /// Creates the service with the default policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, QueryPolicy::default())
    }

    /// Creates the service with a custom policy.
    pub fn with_policy(store: S, policy: QueryPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the policy in use.
    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Products whose latest event is a borrow older than `lost_after`.
    #[tracing::instrument(skip(self))]
    pub async fn lost_products(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        // Every event type is needed: a later return must hide the borrow.
        let log = self
            .store
            .read_log(LogQuery::all(StreamName::ProductEvents))
            .await?;

        let lost = find_stale(&log, &self.policy.borrow_type, now, self.policy.lost_after)?;
        tracing::info!(count = lost.len(), "lost products resolved");
        Ok(lost)
    }

    /// Borrowed products whose borrower's latest payment method expires
    /// within `payment_lead_time`.
    #[tracing::instrument(skip(self))]
    pub async fn borrowed_with_expiring_payment(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ExpiringReport> {
        let products_query = LogQuery::all(StreamName::ProductEvents);
        let users_query = LogQuery::all(StreamName::UserEvents)
            .event_type(self.policy.payment_method_type.clone())
            .with_metadata();

        let (products, users) = futures_util::try_join!(
            self.store.read_log(products_query),
            self.store.read_log(users_query),
        )?;

        let query = ExpiringQuery::new(
            self.policy.borrow_type.clone(),
            self.policy.payment_method_type.clone(),
            self.policy.payment_lead_time,
        )
        .join_key(JoinKey::attribute(self.policy.user_attribute.clone()))
        .expiry_field(self.policy.expiry_field.clone());

        let report = find_expiring_joined_with(&products, &users, &query, now)?;
        tracing::info!(
            count = report.records.len(),
            rejected = report.rejected.len(),
            "expiring payment methods resolved"
        );
        Ok(report)
    }
}
