//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! .env + .env.<scope>
//!     → env.rs (DotenvEnv snapshot behind EnvironmentAccessor)
//!     → read per request by gates and the proxy
//!
//! On admin toggle:
//!     env_file.rs rewrites .env.<scope> (temp file + rename)
//!     → watcher.rs sees the change
//!     → env.rs swaps in a fresh snapshot
//! ```
//!
//! # Design Decisions
//! - Process config is immutable once loaded; changes require a restart
//! - Env values are read at call time so flips apply without a restart
//! - All fields have defaults to allow minimal configs

pub mod env;
pub mod env_file;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use env::{DotenvEnv, EnvironmentAccessor, MapEnv, ProcessEnv};
pub use env_file::EnvFileStore;
pub use error::ConfigError;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::UpstreamConfig;
