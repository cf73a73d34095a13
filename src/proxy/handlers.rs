//! Axum handlers for `/api/ollama/*`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::gateway::GatewayError;
use crate::proxy::upstream::{Endpoint, UpstreamReply};

/// `GET /api/ollama/models`
pub async fn list_models(State(state): State<AppState>) -> Response {
    let result = state.gateway.list_models().await;
    respond(&state, Endpoint::Tags, result)
}

/// `POST /api/ollama/prompt`
pub async fn complete_prompt(State(state): State<AppState>, body: Bytes) -> Response {
    let result = state.gateway.complete_prompt(body).await;
    respond(&state, Endpoint::Generate, result)
}

/// `POST /api/ollama/chat`
pub async fn execute_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let result = state.gateway.execute_chat(body).await;
    respond(&state, Endpoint::Chat, result)
}

fn respond(
    state: &AppState,
    endpoint: Endpoint,
    result: Result<UpstreamReply, GatewayError>,
) -> Response {
    let response = match result {
        Ok(reply) => reply.into_response(),
        Err(GatewayError::Validation(_)) => ApiError::missing_parameters().into_response(),
        Err(GatewayError::Upstream { source, .. }) => {
            let error = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, endpoint.failure_message());
            // causes can leak internal addresses, show them in dev only
            if state.env.is_development_mode() {
                error.with_detail(source.to_string()).into_response()
            } else {
                error.into_response()
            }
        }
    };

    metrics::record_request(endpoint.label(), response.status().as_u16());
    response
}
