#[cfg(feature = "storage-local")]
use crate::LocalMedium;
#[cfg(feature = "storage-memory")]
use crate::MemoryMedium;
use crate::{StateDb, StateMedium, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use trellis_core::Config;

/// Create a persistence medium based on configuration
pub async fn create_medium(config: &Config) -> StorageResult<Arc<dyn StateMedium>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.state_dir().ok_or_else(|| {
                StorageError::ConfigError("TRELLIS_STATE_DIR not configured".to_string())
            })?;

            let medium = LocalMedium::new(base_path).await?;
            tracing::info!(path = %base_path.display(), "Using local state storage");
            Ok(Arc::new(medium))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            tracing::info!("Using in-memory state storage; state will not survive restarts");
            Ok(Arc::new(MemoryMedium::new()))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}

/// Create the configured medium and open the configured namespace on it
pub async fn open_state_db(config: &Config) -> StorageResult<StateDb> {
    let medium = create_medium(config).await?;
    StateDb::new(medium, config.namespace())
}
