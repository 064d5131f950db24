//! HTTP API for the lending reports.
//!
//! Serves the lost-product and expiring-payment queries over the product
//! and user event logs, with structured logging (tracing) and Prometheus
//! metrics.

pub mod clock;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{LifecycleQueries, QueryPolicy};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, DatabaseConfig};

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub queries: LifecycleQueries<S>,
    pub clock: Arc<dyn Clock>,
    /// Name of the store backend, reported by `/health`.
    pub backend: &'static str,
}

impl<S: EventStore> AppState<S> {
    pub fn new(store: S, policy: QueryPolicy, clock: Arc<dyn Clock>, backend: &'static str) -> Self {
        Self {
            queries: LifecycleQueries::with_policy(store, policy),
            clock,
            backend,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/product-lost", get(routes::lending::product_lost::<S>))
        .route(
            "/product-borrowed-expired",
            get(routes::lending::product_borrowed_expired::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
