//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → transport.rs (SSL_ONLY: redirect plain HTTP)
//!     → maintenance.rs (MAINTENANCE_MODE: 503)
//!     → auth.rs (X-API-TOKEN must equal API_TOKEN)
//!     → Pass to proxy handlers
//! ```
//!
//! # Design Decisions
//! - Gates read the environment per request; flips need no restart
//! - Fail closed: a missing API_TOKEN denies every request
//! - Token comparison is constant-time

pub mod auth;
pub mod maintenance;
pub mod transport;
