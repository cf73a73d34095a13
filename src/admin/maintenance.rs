//! Maintenance-mode toggle.
//!
//! Flips `MAINTENANCE_MODE` in the active scope file: `"true"` becomes
//! `"false"`, anything else becomes `"true"`. Shared by the admin route and
//! `gateway-cli toggle-maintenance`.

use crate::config::env::{EnvironmentAccessor, MAINTENANCE_MODE};
use crate::config::{ConfigError, EnvFileStore};

/// The value a toggle writes given the current one.
pub fn inverse(current: &str) -> &'static str {
    if current == "true" {
        "false"
    } else {
        "true"
    }
}

pub struct MaintenanceToggle<'a> {
    env: &'a dyn EnvironmentAccessor,
    store: &'a EnvFileStore,
}

impl<'a> MaintenanceToggle<'a> {
    pub fn new(env: &'a dyn EnvironmentAccessor, store: &'a EnvFileStore) -> Self {
        Self { env, store }
    }

    /// Write the inverse of the current value and return it.
    ///
    /// Nothing is written when `MAINTENANCE_MODE` is unset.
    pub fn toggle(&self) -> Result<String, ConfigError> {
        let current = self.env.get(MAINTENANCE_MODE)?;
        let next = inverse(&current);

        let path = self.store.update(MAINTENANCE_MODE, next)?;

        if let Err(e) = self.env.refresh() {
            tracing::warn!(error = %e, "Env snapshot not refreshed after toggle");
        }

        tracing::info!(
            file = %path.display(),
            from = %current,
            to = next,
            "Maintenance mode toggled"
        );
        Ok(next.to_string())
    }
}
