//! Operator endpoints.
//!
//! Mounted outside the maintenance gate so an operator can always switch
//! maintenance off again.

pub mod auth;
pub mod handlers;
pub mod maintenance;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub use maintenance::MaintenanceToggle;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/maintenance", post(toggle_maintenance))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
