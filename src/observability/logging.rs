//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable with `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Per-request spans come from tower-http's `TraceLayer`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install the global subscriber for the gateway process.
pub fn init(config: &ObservabilityConfig) {
    init_with_default(&format!(
        "ollama_gateway={},tower_http=info",
        config.log_level
    ));
}

/// Install the global subscriber, using `default_directive` when
/// `RUST_LOG` is unset or invalid.
pub fn init_with_default(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
