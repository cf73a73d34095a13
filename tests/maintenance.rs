//! Maintenance mode flipped through the admin API against real env files.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

use ollama_gateway::config::{DotenvEnv, EnvFileStore};
use ollama_gateway::GatewayConfig;

mod common;
use common::{server_with, start_backend, TOKEN};

const ADMIN_KEY: &str = "admin-key";

fn env_dir(backend_url: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "# shared\nAPP_ENV=prod\n").unwrap();
    fs::write(
        dir.path().join(".env.prod"),
        format!(
            "OLLAMA_API_URL={backend_url}\nAPI_TOKEN={TOKEN}\nMAINTENANCE_MODE=false\nSSL_ONLY=false\n"
        ),
    )
    .unwrap();
    dir
}

fn admin_config(dir: &TempDir) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.environment.root_dir = dir.path().display().to_string();
    config.environment.watch = false;
    config
}

fn request(method: Method, path: &str, auth: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some((name, value)) = auth {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn toggle() -> Request<Body> {
    request(
        Method::POST,
        "/admin/maintenance",
        Some((header::AUTHORIZATION.as_str(), "Bearer admin-key")),
    )
}

fn models() -> Request<Body> {
    request(Method::GET, "/api/ollama/models", Some(("X-API-TOKEN", TOKEN)))
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn process_env_shadows() -> bool {
    ["MAINTENANCE_MODE", "API_TOKEN", "OLLAMA_API_URL", "APP_ENV"]
        .iter()
        .any(|key| std::env::var_os(key).is_some())
}

#[tokio::test]
async fn test_admin_toggle_round_trip() {
    if process_env_shadows() {
        return;
    }
    let backend = start_backend(200, "application/json", r#"{"models":[]}"#).await;
    let dir = env_dir(&backend.url());
    let original = fs::read_to_string(dir.path().join(".env.prod")).unwrap();

    let env = DotenvEnv::load(EnvFileStore::new(dir.path()));
    let router = server_with(admin_config(&dir), env).router();

    let (status, _) = call(&router, models()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&router, toggle()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance_mode"], "true");
    assert!(fs::read_to_string(dir.path().join(".env.prod"))
        .unwrap()
        .contains("MAINTENANCE_MODE=true\n"));

    // takes effect without a restart
    let (status, _) = call(&router, models()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // admin routes stay reachable during maintenance
    let (status, body) = call(
        &router,
        request(
            Method::GET,
            "/admin/status",
            Some(("authorization", "Bearer admin-key")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance_mode"], true);
    assert_eq!(body["environment"], "prod");

    let (status, body) = call(&router, toggle()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance_mode"], "false");

    let (status, _) = call(&router, models()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fs::read_to_string(dir.path().join(".env.prod")).unwrap(),
        original
    );
}

#[tokio::test]
async fn test_admin_requires_key() {
    let dir = env_dir("http://127.0.0.1:1");
    let env = DotenvEnv::load(EnvFileStore::new(dir.path()));
    let router = server_with(admin_config(&dir), env).router();
    let before = fs::read_to_string(dir.path().join(".env.prod")).unwrap();

    for auth in [None, Some(("authorization", "Bearer wrong")), Some(("authorization", "admin-key"))] {
        let (status, _) = call(&router, request(Method::POST, "/admin/maintenance", auth)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    assert_eq!(
        fs::read_to_string(dir.path().join(".env.prod")).unwrap(),
        before
    );
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let dir = env_dir("http://127.0.0.1:1");
    let mut config = admin_config(&dir);
    config.admin.enabled = false;
    let env = DotenvEnv::load(EnvFileStore::new(dir.path()));
    let router = server_with(config, env).router();

    let (status, body) = call(&router, toggle()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found");
}

#[tokio::test]
async fn test_toggle_without_key_reports_error() {
    if process_env_shadows() {
        return;
    }
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "APP_ENV=prod\n").unwrap();
    fs::write(dir.path().join(".env.prod"), "API_TOKEN=x\n").unwrap();

    let env = DotenvEnv::load(EnvFileStore::new(dir.path()));
    let router = server_with(admin_config(&dir), env).router();

    let (status, body) = call(&router, toggle()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Process error");
    assert_eq!(
        fs::read_to_string(dir.path().join(".env.prod")).unwrap(),
        "API_TOKEN=x\n"
    );
}
