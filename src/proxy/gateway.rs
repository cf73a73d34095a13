//! The three proxied operations.

use axum::body::Bytes;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::config::env::{EnvironmentAccessor, OLLAMA_API_URL};
use crate::observability::metrics;
use crate::proxy::payload::{self, ValidationError, CHAT_FIELDS, PROMPT_FIELDS};
use crate::proxy::upstream::{Endpoint, OllamaClient, UpstreamError, UpstreamReply};

/// Why a proxied operation did not produce an upstream reply.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected before any upstream call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The upstream call failed (transport or decode).
    #[error("{}: {source}", .endpoint.failure_message())]
    Upstream {
        endpoint: Endpoint,
        #[source]
        source: UpstreamError,
    },
}

/// Validates inbound payloads and forwards them to Ollama.
///
/// Stateless per call: the backend URL is read from the environment on
/// every request.
pub struct OllamaGateway {
    client: OllamaClient,
    env: Arc<dyn EnvironmentAccessor>,
}

impl OllamaGateway {
    pub fn new(client: OllamaClient, env: Arc<dyn EnvironmentAccessor>) -> Self {
        Self { client, env }
    }

    /// `GET /api/tags`.
    pub async fn list_models(&self) -> Result<UpstreamReply, GatewayError> {
        self.forward(Endpoint::Tags, None).await
    }

    /// `POST /api/generate`; requires `model` and `prompt`.
    pub async fn complete_prompt(&self, body: Bytes) -> Result<UpstreamReply, GatewayError> {
        self.validate_and_forward(Endpoint::Generate, PROMPT_FIELDS, body).await
    }

    /// `POST /api/chat`; requires `model` and `messages`.
    pub async fn execute_chat(&self, body: Bytes) -> Result<UpstreamReply, GatewayError> {
        self.validate_and_forward(Endpoint::Chat, CHAT_FIELDS, body).await
    }

    async fn validate_and_forward(
        &self,
        endpoint: Endpoint,
        fields: &[&'static str],
        body: Bytes,
    ) -> Result<UpstreamReply, GatewayError> {
        let payload = payload::require_fields(&body, fields).map_err(|e| {
            tracing::debug!(endpoint = endpoint.label(), error = ?e, "Rejected payload");
            e
        })?;

        tracing::debug!(
            endpoint = endpoint.label(),
            model = ?payload.get("model"),
            stream = payload::wants_stream(&payload),
            "Forwarding payload"
        );

        // the original bytes go upstream, not a re-serialization
        self.forward(endpoint, Some(body)).await
    }

    async fn forward(
        &self,
        endpoint: Endpoint,
        body: Option<Bytes>,
    ) -> Result<UpstreamReply, GatewayError> {
        let start = Instant::now();

        let result = match self.env.lookup(OLLAMA_API_URL) {
            Some(base_url) => self.client.call(&base_url, endpoint, body).await,
            None => Err(UpstreamError::NotConfigured),
        };

        match result {
            Ok(reply) => {
                metrics::record_upstream_call(endpoint.label(), start);
                tracing::debug!(
                    endpoint = endpoint.label(),
                    status = %reply.status,
                    bytes = reply.body.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream replied"
                );
                Ok(reply)
            }
            Err(source) => {
                metrics::record_upstream_error(endpoint.label());
                tracing::error!(
                    endpoint = endpoint.label(),
                    error = %source,
                    "{}",
                    endpoint.failure_message()
                );
                Err(GatewayError::Upstream { endpoint, source })
            }
        }
    }
}
