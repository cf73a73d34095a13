use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::auth::constant_time_eq;

/// Bearer check against `admin.api_key`. An empty key denies everything.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.admin.api_key.as_str();

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(key) if !expected.is_empty() && constant_time_eq(key, expected) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            metrics::record_rejection("admin_auth");
            ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
