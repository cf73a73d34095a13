//! Outbound calls to the Ollama backend.
//!
//! # Responsibilities
//! - Build endpoint URLs from the configured base URL
//! - Issue exactly one request per call (no retries)
//! - Buffer the reply and check it is JSON before it is relayed
//!
//! # Design Decisions
//! - Non-2xx replies are not errors; they are relayed as they are
//! - Transport failures and undecodable bodies share one error type
//! - `stream: true` replies (newline-delimited JSON) are buffered and
//!   relayed as one body

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::IgnoredAny;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;

/// Backend endpoints the gateway forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /api/tags`
    Tags,
    /// `POST /api/generate`
    Generate,
    /// `POST /api/chat`
    Chat,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Tags => "/api/tags",
            Endpoint::Generate => "/api/generate",
            Endpoint::Chat => "/api/chat",
        }
    }

    /// Short name used in logs and metric labels.
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Tags => "models",
            Endpoint::Generate => "prompt",
            Endpoint::Chat => "chat",
        }
    }

    /// Message reported to callers when the call fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Endpoint::Tags => "Error to get models list from Ollama API",
            Endpoint::Generate => "Error to execute prompt with Ollama API",
            Endpoint::Chat => "Error to execute chat with Ollama API",
        }
    }
}

/// Errors of a single upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("OLLAMA_API_URL is not set")]
    NotConfigured,

    #[error("invalid OLLAMA_API_URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A buffered upstream reply, relayed without modification.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// HTTP client for the Ollama API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http })
    }

    /// Call `endpoint` under `base_url`. `body`, when given, is sent as-is
    /// with a JSON content type.
    pub async fn call(
        &self,
        base_url: &str,
        endpoint: Endpoint,
        body: Option<Bytes>,
    ) -> Result<UpstreamReply, UpstreamError> {
        let url = endpoint_url(base_url, endpoint)?;

        let request = match body {
            Some(body) => self
                .http
                .post(url)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body),
            None => self.http.get(url),
        };

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| HeaderValue::from_str(v).ok());
        let body = response.bytes().await?;

        check_json(&body).map_err(UpstreamError::Decode)?;

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }
}

/// `<base>` + endpoint path, with trailing slashes on the base ignored.
pub fn endpoint_url(base_url: &str, endpoint: Endpoint) -> Result<String, UpstreamError> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(UpstreamError::NotConfigured);
    }

    let invalid = |reason: String| UpstreamError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let url = format!("{}{}", base, endpoint.path());
    let parsed = Url::parse(&url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", parsed.scheme())));
    }
    Ok(url)
}

/// Accept one JSON document or a sequence of them (NDJSON).
fn check_json(body: &[u8]) -> Result<(), serde_json::Error> {
    let mut documents = 0usize;
    for document in serde_json::Deserializer::from_slice(body).into_iter::<IgnoredAny>() {
        document?;
        documents += 1;
    }

    if documents == 0 {
        // empty or whitespace-only: surface serde's EOF error
        serde_json::from_slice::<IgnoredAny>(body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("http://localhost:11434", Endpoint::Tags).unwrap(),
            "http://localhost:11434/api/tags"
        );
        assert_eq!(
            endpoint_url("http://ollama:11434/", Endpoint::Chat).unwrap(),
            "http://ollama:11434/api/chat"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_bad_base() {
        assert!(matches!(
            endpoint_url("  ", Endpoint::Generate),
            Err(UpstreamError::NotConfigured)
        ));
        assert!(matches!(
            endpoint_url("localhost:11434", Endpoint::Generate),
            Err(UpstreamError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_check_json_documents() {
        assert!(check_json(br#"{"models":[]}"#).is_ok());
        assert!(check_json(b"{\"response\":\"a\",\"done\":false}\n{\"response\":\"b\",\"done\":true}\n").is_ok());
        assert!(check_json(b"").is_err());
        assert!(check_json(b" \n").is_err());
        assert!(check_json(b"<html>502</html>").is_err());
        assert!(check_json(b"{\"done\":true}\ngarbage").is_err());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            Endpoint::Tags.failure_message(),
            "Error to get models list from Ollama API"
        );
        assert_eq!(Endpoint::Chat.path(), "/api/chat");
    }
}
