//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use ollama_gateway::config::env::{API_TOKEN, OLLAMA_API_URL};
use ollama_gateway::config::{EnvironmentAccessor, MapEnv};
use ollama_gateway::{GatewayConfig, HttpServer};

pub const TOKEN: &str = "test-token";

/// A request seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Bytes,
}

/// A mock Ollama backend that answers every request the same way and
/// records what it received.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Start a mock backend on an ephemeral port.
pub async fn start_backend(
    status: u16,
    content_type: &'static str,
    reply: &'static str,
) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let recorder = calls.clone();
    let app = Router::new().fallback(move |method: Method, uri: Uri, body: Bytes| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().unwrap().push(Recorded {
                method,
                path: uri.path().to_string(),
                body,
            });
            let response: Response = (
                StatusCode::from_u16(status).unwrap(),
                [(header::CONTENT_TYPE, content_type)],
                reply,
            )
                .into_response();
            response
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, calls }
}

/// Environment with a valid token pointing at `backend_url`.
pub fn env_for(backend_url: &str) -> MapEnv {
    MapEnv::new()
        .with(OLLAMA_API_URL, backend_url)
        .with(API_TOKEN, TOKEN)
        .with("APP_ENV", "prod")
        .with("MAINTENANCE_MODE", "false")
}

pub fn server(env: impl EnvironmentAccessor + 'static) -> HttpServer {
    server_with(GatewayConfig::default(), env)
}

pub fn server_with(config: GatewayConfig, env: impl EnvironmentAccessor + 'static) -> HttpServer {
    HttpServer::new(config, Arc::new(env)).unwrap()
}
