//! Errors raised while reading or rewriting environment configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of environment lookups and env-file rewrites.
///
/// Every variant is fatal to the single operation in progress. A failed
/// rewrite never leaves the target file partially modified.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The active scope name could not be read from the base file.
    #[error("APP_ENV not found in {}: {reason}", path.display())]
    ScopeNotFound { path: PathBuf, reason: String },

    /// The scope-specific env file does not exist.
    #[error("{} file not found", path.display())]
    FileNotFound { path: PathBuf },

    /// The scope-specific env file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key is not defined (in the env file or the environment).
    #[error("{key} not found in {location}")]
    KeyNotFound { key: String, location: String },

    /// The rewritten content could not be persisted.
    #[error("Failed to write to {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn key_not_found(key: &str, location: impl Into<String>) -> Self {
        Self::KeyNotFound {
            key: key.to_string(),
            location: location.into(),
        }
    }
}
