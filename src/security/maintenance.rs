//! Maintenance gate.
//!
//! While `MAINTENANCE_MODE=true` the proxy routes answer 503. The admin
//! routes are mounted outside this gate so maintenance can be switched
//! off again over HTTP.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Seconds suggested to clients in `Retry-After`.
const RETRY_AFTER_SECS: &str = "60";

pub async fn maintenance_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.env.is_maintenance_mode() {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Rejected during maintenance");
    metrics::record_rejection("maintenance");

    let mut response = ApiError::maintenance().into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
    response
}
