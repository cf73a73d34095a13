//! Env-file watcher for hot reload.
//!
//! The directory is watched rather than the files themselves: rewrites
//! replace the scope file through a rename, which a file-level watch on
//! some platforms stops following.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::env::EnvironmentAccessor;
use crate::config::env_file::EnvFileStore;

/// Refreshes an accessor whenever one of the store's env files changes.
pub struct EnvWatcher {
    store: EnvFileStore,
    env: Arc<dyn EnvironmentAccessor>,
}

impl EnvWatcher {
    pub fn new(store: EnvFileStore, env: Arc<dyn EnvironmentAccessor>) -> Self {
        Self { store, env }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are
    /// wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let base_file = self.store.base_file().to_string();
        let env = self.env.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    if !event.paths.iter().any(|p| is_env_file(p, &base_file)) {
                        return;
                    }

                    tracing::info!(paths = ?event.paths, "Env file change detected, reloading...");
                    if let Err(e) = env.refresh() {
                        tracing::error!("Failed to reload env files: {}. Keeping current values.", e);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.store.root(), RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.store.root(), "Env watcher started");
        Ok(watcher)
    }
}

/// True for `<base>` and `<base>.<scope>`, false for temp files and others.
fn is_env_file(path: &Path, base_file: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    match name.strip_prefix(base_file) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .is_some_and(|scope| !scope.is_empty() && scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')),
        None => false,
    }
}
