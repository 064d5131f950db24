//! The two lending report endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, NaiveDate, Utc};
use event_store::{Event, EventStore, Metadata};
use projections::{ExpiringRecord, ProjectionError};
use serde::Serialize;

use crate::AppState;
use crate::error::{ApiError, Endpoint, SuccessEnvelope};

/// A product transaction whose latest event is a stale borrow.
#[derive(Debug, Serialize)]
pub struct LostProductRow {
    pub transaction_id: String,
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    pub evt_type: String,
    pub evt_date: DateTime<Utc>,
    pub meta: Option<Metadata>,
}

impl From<Event> for LostProductRow {
    fn from(event: Event) -> Self {
        Self {
            product_id: event.attribute("product_id").map(String::from),
            user_id: event.attribute("user_id").map(String::from),
            transaction_id: event.entity_id.to_string(),
            evt_type: event.event_type,
            evt_date: event.occurred_at,
            meta: event.metadata,
        }
    }
}

/// A borrowed product whose borrower's payment method is about to expire.
#[derive(Debug, Serialize)]
pub struct ExpiringBorrowRow {
    pub product_id: Option<String>,
    pub evt_type: String,
    pub transaction_id: String,
    pub user_id: String,
    pub valid_until: String,
    pub expires_on: NaiveDate,
}

impl From<ExpiringRecord> for ExpiringBorrowRow {
    fn from(expiring: ExpiringRecord) -> Self {
        let expires_on = expiring.expires_on();
        let primary = expiring.record.primary;
        Self {
            product_id: primary.attribute("product_id").map(String::from),
            evt_type: primary.event_type,
            transaction_id: primary.entity_id.to_string(),
            user_id: expiring.record.key.to_string(),
            valid_until: expiring.valid_until.to_string(),
            expires_on,
        }
    }
}

type QueryResponse<T> = Result<Json<SuccessEnvelope<Vec<T>>>, ApiError>;

fn record_request<T>(endpoint: Endpoint, result: &Result<T, ProjectionError>) {
    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::counter!("api_requests", "endpoint" => endpoint.label(), "outcome" => outcome)
        .increment(1);
}

/// GET /product-lost: borrowed products never returned within the
/// configured window.
#[tracing::instrument(skip(state))]
pub async fn product_lost<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> QueryResponse<LostProductRow> {
    let endpoint = Endpoint::ProductLost;
    let now = state.clock.now();

    let result = state.queries.lost_products(now).await;
    record_request(endpoint, &result);
    let lost = result.map_err(|err| ApiError::new(endpoint, err))?;

    let rows = lost.into_iter().map(LostProductRow::from).collect();
    Ok(Json(SuccessEnvelope::new(endpoint, rows)))
}

/// GET /product-borrowed-expired: borrowed products whose borrower's
/// latest payment method expires within the configured lead time.
#[tracing::instrument(skip(state))]
pub async fn product_borrowed_expired<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> QueryResponse<ExpiringBorrowRow> {
    let endpoint = Endpoint::ProductBorrowedExpired;
    let now = state.clock.now();

    let result = state.queries.borrowed_with_expiring_payment(now).await;
    record_request(endpoint, &result);
    let report = result.map_err(|err| ApiError::new(endpoint, err))?;

    if !report.rejected.is_empty() {
        tracing::warn!(
            endpoint = %endpoint,
            rejected = report.rejected.len(),
            "payment methods with unreadable expiry left out of the report"
        );
    }

    let rows = report
        .records
        .into_iter()
        .map(ExpiringBorrowRow::from)
        .collect();
    Ok(Json(SuccessEnvelope::new(endpoint, rows)))
}
