//! API error type and the JSON response envelope.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use projections::ProjectionError;
use serde::Serialize;

/// Seconds a client should wait before retrying after a store outage.
pub const RETRY_AFTER_SECS: u32 = 5;

/// The query endpoints, used to pick envelope messages and tag logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ProductLost,
    ProductBorrowedExpired,
}

impl Endpoint {
    /// Route label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::ProductLost => "product_lost",
            Endpoint::ProductBorrowedExpired => "product_borrowed_expired",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Endpoint::ProductLost => "Successfully retrieved lost products",
            Endpoint::ProductBorrowedExpired => {
                "Successfully retrieved borrowed products nearing expiration"
            }
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Endpoint::ProductLost => "Failed to retrieve lost products",
            Endpoint::ProductBorrowedExpired => {
                "Failed to retrieve borrowed products nearing expiration"
            }
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Body of a successful query response.
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub status: &'static str,
    pub message: &'static str,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(endpoint: Endpoint, data: T) -> Self {
        Self {
            status: "success",
            message: endpoint.success_message(),
            data,
        }
    }
}

/// Body of a failed query response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub message: &'static str,
    pub error: String,
}

/// A query failure on a specific endpoint.
#[derive(Debug, thiserror::Error)]
#[error("{endpoint}: {source}")]
pub struct ApiError {
    pub endpoint: Endpoint,
    pub source: ProjectionError,
}

impl ApiError {
    pub fn new(endpoint: Endpoint, source: ProjectionError) -> Self {
        Self { endpoint, source }
    }

    /// HTTP status for the failure. Every query failure is a 500;
    /// retryable ones are told apart by `Retry-After`.
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            retryable = self.source.is_retryable(),
            error = %self.source,
            "query failed"
        );

        let body = ErrorEnvelope {
            status: "error",
            message: self.endpoint.failure_message(),
            error: self.source.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if self.source.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}
