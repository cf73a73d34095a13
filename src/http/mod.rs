//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → security gates, then proxy handlers
//!     → response.rs (gateway-generated error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod visitor;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer, ServerError};
