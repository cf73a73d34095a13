//! Environment access.
//!
//! # Responsibilities
//! - Resolve runtime settings (`OLLAMA_API_URL`, `API_TOKEN`, flags)
//! - Answer the derived mode queries used by gates and handlers
//! - Keep a file-backed snapshot that can be refreshed after rewrites
//!
//! # Design Decisions
//! - Access goes through the `EnvironmentAccessor` trait, injected as
//!   `Arc<dyn EnvironmentAccessor>`, so tests pass an explicit map
//! - `DotenvEnv` layers base file, scope file, then process variables
//!   (later layers win)
//! - A snapshot is swapped atomically; a failed reload keeps the old one

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::env_file::{EnvFileStore, SCOPE_KEY};
use crate::config::error::ConfigError;

/// Upstream base URL key.
pub const OLLAMA_API_URL: &str = "OLLAMA_API_URL";
/// Shared secret expected in the API token header.
pub const API_TOKEN: &str = "API_TOKEN";
pub const MAINTENANCE_MODE: &str = "MAINTENANCE_MODE";
pub const SSL_ONLY: &str = "SSL_ONLY";

/// Read access to process-visible configuration values.
pub trait EnvironmentAccessor: Send + Sync {
    /// Raw lookup; `None` when the key is unset.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Value of `key`, or `KeyNotFound` when unset.
    fn get(&self, key: &str) -> Result<String, ConfigError> {
        self.lookup(key)
            .ok_or_else(|| ConfigError::key_not_found(key, "environment"))
    }

    /// True iff the value is exactly `"true"`.
    fn is_flag_enabled(&self, key: &str) -> bool {
        self.lookup(key).as_deref() == Some("true")
    }

    fn is_maintenance_mode(&self) -> bool {
        self.is_flag_enabled(MAINTENANCE_MODE)
    }

    /// True when the active environment is `dev` or `test`.
    fn is_development_mode(&self) -> bool {
        matches!(self.lookup(SCOPE_KEY).as_deref(), Some("dev") | Some("test"))
    }

    fn is_ssl_only(&self) -> bool {
        self.is_flag_enabled(SSL_ONLY)
    }

    /// Re-read backing storage. No-op for static sources.
    fn refresh(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Fixed key/value mapping.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentAccessor for MapEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentAccessor for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Env files layered under the process environment.
pub struct DotenvEnv {
    store: EnvFileStore,
    snapshot: ArcSwap<HashMap<String, String>>,
}

impl DotenvEnv {
    /// Load the files of `store`. A missing base file yields an empty file
    /// layer; process variables are still visible.
    pub fn load(store: EnvFileStore) -> Self {
        let values = read_layers(&store);
        Self {
            store,
            snapshot: ArcSwap::from_pointee(values),
        }
    }

    pub fn store(&self) -> &EnvFileStore {
        &self.store
    }

    /// Number of keys currently defined by the files.
    pub fn file_keys(&self) -> usize {
        self.snapshot.load().len()
    }
}

impl EnvironmentAccessor for DotenvEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| self.snapshot.load().get(key).cloned())
    }

    fn refresh(&self) -> Result<(), ConfigError> {
        // the base file must still name a scope, otherwise keep what we have
        let scope = self.store.active_scope()?;
        let values = read_layers(&self.store);
        tracing::debug!(scope = %scope, keys = values.len(), "Env snapshot reloaded");
        self.snapshot.store(Arc::new(values));
        Ok(())
    }
}

fn read_layers(store: &EnvFileStore) -> HashMap<String, String> {
    let mut values = HashMap::new();
    read_file_into(&store.base_path(), &mut values);

    let scope = values.get(SCOPE_KEY).cloned();
    if let Some(scope) = scope {
        read_file_into(&store.scope_path(&scope), &mut values);
    }
    values
}

fn read_file_into(path: &Path, values: &mut HashMap<String, String>) {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Env file not loaded");
            return;
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed env line");
            }
        }
    }
}
