//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, header names and value ranges
//! - Check that the inbound timeout outlives the upstream timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("timeouts.request_secs ({request}) must exceed upstream.request_timeout_secs ({upstream})")]
    TimeoutOrder { request: u64, upstream: u64 },

    #[error("security.token_header: invalid header name {0:?}")]
    InvalidHeader(String),

    #[error("environment.base_file must not be empty")]
    EmptyBaseFile,

    #[error("admin.api_key must be set when admin.enabled is true")]
    MissingAdminKey,
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (field, value) in [
        ("upstream.connect_timeout_secs", config.upstream.connect_timeout_secs),
        ("upstream.request_timeout_secs", config.upstream.request_timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero {
            field: "security.max_body_size",
        });
    }

    if config.timeouts.request_secs <= config.upstream.request_timeout_secs {
        errors.push(ValidationError::TimeoutOrder {
            request: config.timeouts.request_secs,
            upstream: config.upstream.request_timeout_secs,
        });
    }

    if HeaderName::try_from(config.security.token_header.as_str()).is_err() {
        errors.push(ValidationError::InvalidHeader(
            config.security.token_header.clone(),
        ));
    }

    if config.environment.base_file.trim().is_empty() {
        errors.push(ValidationError::EmptyBaseFile);
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
