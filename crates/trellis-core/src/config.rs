//! Configuration module
//!
//! Settings are read from `TRELLIS_*` environment variables (a `.env` file is loaded first
//! when present). Every variable has a default, so an empty environment yields a usable
//! local configuration.

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_LOG_FILTER, DEFAULT_NAMESPACE, DEFAULT_STATE_DIR};
use crate::storage_types::StorageBackend;

/// Application state configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub namespace: String,
    pub app_version: String,
    pub storage_backend: StorageBackend,
    pub state_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    /// Build a configuration for the given namespace and version with an in-memory backend.
    pub fn new(namespace: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            app_version: app_version.into(),
            storage_backend: StorageBackend::Memory,
            state_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Switch to the local file backend rooted at `state_dir`.
    pub fn with_local_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.storage_backend = StorageBackend::Local;
        self.state_dir = Some(state_dir.into());
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let storage_backend = match var("TRELLIS_STORAGE_BACKEND") {
            Some(raw) => raw.trim().parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let state_dir = match storage_backend {
            StorageBackend::Local => Some(
                var("TRELLIS_STATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            ),
            StorageBackend::Memory => var("TRELLIS_STATE_DIR").map(PathBuf::from),
        };

        let config = Config {
            namespace: var("TRELLIS_NAMESPACE")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            app_version: var("TRELLIS_APP_VERSION")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            storage_backend,
            state_dir,
            log_filter: var("TRELLIS_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.namespace.trim().is_empty() {
            return Err(anyhow::anyhow!("TRELLIS_NAMESPACE must not be empty"));
        }

        if self.app_version.trim().is_empty() {
            return Err(anyhow::anyhow!("TRELLIS_APP_VERSION must not be empty"));
        }

        if self.storage_backend == StorageBackend::Local && self.state_dir.is_none() {
            return Err(anyhow::anyhow!(
                "TRELLIS_STATE_DIR must be set when using the local storage backend"
            ));
        }

        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn state_dir(&self) -> Option<&Path> {
        self.state_dir.as_deref()
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }
}
