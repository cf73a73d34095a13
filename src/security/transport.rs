//! SSL-only gate.
//!
//! TLS terminates in front of the gateway, so "received over HTTPS" means
//! an `https` URI scheme or `X-Forwarded-Proto: https` set by that proxy.
//! With `SSL_ONLY=true` plain requests are redirected (308) to the same
//! URL on `https`.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn ssl_only_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.env.is_ssl_only() || is_secure(&request) {
        return next.run(request).await;
    }

    metrics::record_rejection("ssl_only");
    match https_location(&request) {
        Some(location) => {
            tracing::debug!(location = %location, "Redirecting plain HTTP request");
            Redirect::permanent(&location).into_response()
        }
        None => ApiError::new(StatusCode::FORBIDDEN, "HTTPS required").into_response(),
    }
}

/// True when the request reached the TLS terminator over HTTPS.
pub fn is_secure<B>(request: &Request<B>) -> bool {
    if request.uri().scheme_str() == Some("https") {
        return true;
    }

    request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

fn https_location<B>(request: &Request<B>) -> Option<String> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Some(format!("https://{host}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_secure() {
        let plain = Request::builder().uri("/api/ollama/models").body(()).unwrap();
        assert!(!is_secure(&plain));

        let forwarded = Request::builder()
            .uri("/api/ollama/models")
            .header("X-Forwarded-Proto", "HTTPS")
            .body(())
            .unwrap();
        assert!(is_secure(&forwarded));

        let absolute = Request::builder()
            .uri("https://gateway.example/api/ollama/models")
            .body(())
            .unwrap();
        assert!(is_secure(&absolute));
    }

    #[test]
    fn test_https_location_keeps_query() {
        let req = Request::builder()
            .uri("/api/ollama/models?verbose=1")
            .header("Host", "gateway.example:8080")
            .body(())
            .unwrap();
        assert_eq!(
            https_location(&req).as_deref(),
            Some("https://gateway.example:8080/api/ollama/models?verbose=1")
        );

        let no_host = Request::builder().uri("/").body(()).unwrap();
        assert_eq!(https_location(&no_host), None);
    }
}
