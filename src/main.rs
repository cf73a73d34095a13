//! Ollama gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──▶ http server (request id, trace, body limit, timeout)
//!         ──▶ ssl-only gate ──▶ maintenance gate ──▶ method ──▶ API token
//!             ──▶ proxy (payload check) ──▶ Ollama backend
//!     ◀── status + body relayed unchanged
//!
//!     .env + .env.<APP_ENV> ──▶ env snapshot (hot reloaded by the watcher)
//!                              read per request by the gates and the proxy
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use ollama_gateway::config::loader::load_config;
use ollama_gateway::config::watcher::EnvWatcher;
use ollama_gateway::config::{DotenvEnv, EnvFileStore, EnvironmentAccessor, GatewayConfig};
use ollama_gateway::lifecycle::{wait_for_signal, Shutdown};
use ollama_gateway::observability::{logging, metrics};
use ollama_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "ollama-gateway")]
#[command(about = "Authenticated HTTP gateway for an Ollama server", long_about = None)]
struct Args {
    /// Path to the TOML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        env_root = %config.environment.root_dir,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let store = EnvFileStore::with_base_file(
        &config.environment.root_dir,
        config.environment.base_file.clone(),
    );
    match store.active_scope() {
        Ok(scope) => tracing::info!(scope = %scope, "Env scope resolved"),
        Err(e) => tracing::warn!(error = %e, "Env scope unavailable; using process env only"),
    }

    let env: Arc<dyn EnvironmentAccessor> = Arc::new(DotenvEnv::load(store.clone()));

    // dropping the watcher stops reloads
    let _watcher = if config.environment.watch {
        match EnvWatcher::new(store, env.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Env watcher not started; file changes need a restart");
                None
            }
        }
    } else {
        None
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, env)?;

    let shutdown = Shutdown::new();
    let drained = shutdown.notified();
    tokio::spawn(wait_for_signal(shutdown));

    server.run(listener, drained).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
