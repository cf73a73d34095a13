//! Shared-secret check for the proxy routes.
//!
//! The expected token is `API_TOKEN`, read from the environment on every
//! request so rotations apply without a restart. An unset or empty token
//! denies everything.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::config::env::API_TOKEN;
use crate::http::server::AppState;
use crate::http::visitor;
use crate::observability::metrics;

/// Compare secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// 401 `{"message": "Invalid access token."}`
pub fn invalid_token() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "message": "Invalid access token." })),
    )
        .into_response()
}

pub async fn api_token_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.env.lookup(API_TOKEN).filter(|t| !t.is_empty());
    let provided = request
        .headers()
        .get(&state.token_header)
        .and_then(|v| v.to_str().ok());

    let Some(expected) = expected else {
        tracing::error!("API_TOKEN is not configured; denying request");
        metrics::record_rejection("auth");
        return invalid_token();
    };

    if provided.is_some_and(|token| constant_time_eq(token, &expected)) {
        return next.run(request).await;
    }

    tracing::warn!(
        client_ip = %visitor::client_ip(&request),
        path = %request.uri().path(),
        token_present = provided.is_some(),
        "Invalid access token"
    );
    metrics::record_rejection("auth");
    invalid_token()
}
