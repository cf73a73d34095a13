//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the gates (SSL-only, maintenance, API token)
//! - Wire up middleware (tracing, limits, request ID, timeouts)
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::admin::setup_admin_router;
use crate::config::{EnvFileStore, EnvironmentAccessor, GatewayConfig};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::{method_not_allowed, not_found};
use crate::proxy::handlers::{complete_prompt, execute_chat, list_models};
use crate::proxy::{OllamaClient, OllamaGateway};
use crate::security::auth::api_token_middleware;
use crate::security::maintenance::maintenance_middleware;
use crate::security::transport::ssl_only_middleware;

/// Errors while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid token header: {0}")]
    TokenHeader(#[from] axum::http::header::InvalidHeaderName),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OllamaGateway>,
    pub env: Arc<dyn EnvironmentAccessor>,
    pub store: EnvFileStore,
    pub config: Arc<GatewayConfig>,
    pub token_header: HeaderName,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        env: Arc<dyn EnvironmentAccessor>,
    ) -> Result<Self, ServerError> {
        let client = OllamaClient::new(&config.upstream)?;
        let token_header = HeaderName::try_from(config.security.token_header.as_str())?;
        let store = EnvFileStore::with_base_file(
            &config.environment.root_dir,
            config.environment.base_file.clone(),
        );

        Ok(Self {
            gateway: Arc::new(OllamaGateway::new(client, env.clone())),
            env,
            store,
            config: Arc::new(config),
            token_header,
        })
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: GatewayConfig,
        env: Arc<dyn EnvironmentAccessor>,
    ) -> Result<Self, ServerError> {
        let state = AppState::new(config, env)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Gate order for `/api/ollama/*`: SSL-only, maintenance, method,
    /// then the API token.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();
        let auth = middleware::from_fn_with_state(state.clone(), api_token_middleware);

        // the method fallback sits outside the route layer so a wrong
        // method answers 405 without a token
        let api = Router::new()
            .route(
                "/api/ollama/models",
                get(list_models)
                    .fallback(method_not_allowed)
                    .route_layer(auth.clone()),
            )
            .route(
                "/api/ollama/prompt",
                post(complete_prompt)
                    .fallback(method_not_allowed)
                    .route_layer(auth.clone()),
            )
            .route(
                "/api/ollama/chat",
                post(execute_chat)
                    .fallback(method_not_allowed)
                    .route_layer(auth),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                maintenance_middleware,
            ));

        let mut router = Router::new().route("/health", get(health)).merge(api);
        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                ssl_only_middleware,
            ))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::X_CONTENT_TYPE_OPTIONS,
                        HeaderValue::from_static("nosniff"),
                    ))
                    .layer(DefaultBodyLimit::disable())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    // innermost: Timeout needs a response body with Default
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The assembled router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin = self.state.config.admin.enabled,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request),
    )
}

/// `GET /health`, outside every gate.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
