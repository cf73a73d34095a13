use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::maintenance::MaintenanceToggle;
use crate::config::env::OLLAMA_API_URL;
use crate::config::env_file::SCOPE_KEY;
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: Option<String>,
    pub maintenance_mode: bool,
    pub ssl_only: bool,
    pub upstream_configured: bool,
}

#[derive(Serialize)]
pub struct MaintenanceStatus {
    pub maintenance_mode: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let env = &state.env;
    let maintenance_mode = env.is_maintenance_mode();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if maintenance_mode { "maintenance" } else { "operational" },
        environment: env.lookup(SCOPE_KEY),
        maintenance_mode,
        ssl_only: env.is_ssl_only(),
        upstream_configured: env
            .lookup(OLLAMA_API_URL)
            .is_some_and(|url| !url.trim().is_empty()),
    })
}

/// `POST /admin/maintenance`
pub async fn toggle_maintenance(State(state): State<AppState>) -> Response {
    let env = state.env.clone();
    let store = state.store.clone();

    // file rewrite and fsync are blocking
    let result = tokio::task::spawn_blocking(move || {
        MaintenanceToggle::new(env.as_ref(), &store).toggle()
    })
    .await;

    match result {
        Ok(Ok(value)) => Json(MaintenanceStatus {
            maintenance_mode: value,
        })
        .into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Maintenance toggle failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Process error")
                .with_detail(e.to_string())
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Maintenance toggle task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Process error").into_response()
        }
    }
}
