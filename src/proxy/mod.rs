//! Ollama proxy subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/ollama/prompt
//!     → handlers.rs (axum extractors, error rendering)
//!     → gateway.rs (payload.rs checks required fields)
//!     → upstream.rs (one call to <OLLAMA_API_URL>/api/generate)
//!     → status + body relayed unchanged
//! ```
//!
//! # Design Decisions
//! - Validation happens before any network call
//! - Beyond required fields the gateway is schema-agnostic
//! - No retries: one upstream failure is reported immediately

pub mod gateway;
pub mod handlers;
pub mod payload;
pub mod upstream;

pub use gateway::{GatewayError, OllamaGateway};
pub use upstream::{Endpoint, OllamaClient, UpstreamError, UpstreamReply};
