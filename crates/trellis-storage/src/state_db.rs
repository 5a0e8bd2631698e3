//! Namespaced JSON state database
//!
//! [`StateDb`] is the application-facing store: every key it reads or writes is confined
//! to its namespace, values are JSON documents, and a save replaces the whole document.
//! Clones share the medium and the namespace lock, so a single instance constructed by the
//! composing root can be handed to every component of that namespace.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::keys::{namespace_prefix, validate_key};
use crate::traits::{StateMedium, StorageResult};
use crate::StorageBackend;

/// One stored key with its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub key: String,
    pub value: Value,
}

#[derive(Clone)]
pub struct StateDb {
    medium: Arc<dyn StateMedium>,
    namespace: Arc<str>,
    prefix: Arc<str>,
    // Shared for reads, exclusive for writes: saves commit in call order and no reader
    // observes a half-cleared namespace.
    lock: Arc<RwLock<()>>,
}

impl std::fmt::Debug for StateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDb")
            .field("namespace", &self.namespace)
            .field("backend", &self.medium.backend_type())
            .finish()
    }
}

impl StateDb {
    /// Open a namespace over a medium.
    pub fn new(medium: Arc<dyn StateMedium>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace: String = namespace.into();
        let prefix = namespace_prefix(&namespace)?;

        Ok(Self {
            medium,
            namespace: namespace.into(),
            prefix: prefix.into(),
            lock: Arc::new(RwLock::new(())),
        })
    }

    /// Open a namespace over a fresh in-memory medium.
    #[cfg(feature = "storage-memory")]
    pub fn in_memory(namespace: impl Into<String>) -> StorageResult<Self> {
        Self::new(Arc::new(crate::MemoryMedium::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.medium.backend_type()
    }

    fn full_key(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(format!("{}{}", self.prefix, key))
    }

    /// The last saved value for `key`, or `None` if it was never written or was cleared.
    pub async fn fetch(&self, key: &str) -> StorageResult<Option<Value>> {
        let full_key = self.full_key(key)?;
        let _guard = self.lock.read().await;

        let raw = self.medium.read(&full_key).await?;
        let value = raw.map(|raw| serde_json::from_str(&raw)).transpose()?;

        tracing::debug!(
            namespace = %self.namespace,
            key = %key,
            found = value.is_some(),
            "State fetch"
        );

        Ok(value)
    }

    /// Typed variant of [`StateDb::fetch`].
    pub async fn fetch_as<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.fetch(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Every entry whose key starts with `prefix`, sorted by key.
    pub async fn fetch_by_prefix(&self, prefix: &str) -> StorageResult<Vec<StateEntry>> {
        let medium_prefix = format!("{}{}", self.prefix, prefix);
        let _guard = self.lock.read().await;

        let mut full_keys = self.medium.list(&medium_prefix).await?;
        full_keys.sort();

        let mut entries = Vec::with_capacity(full_keys.len());
        for full_key in full_keys {
            // a medium shared with other processes may lose a key between list and read
            let Some(raw) = self.medium.read(&full_key).await? else {
                continue;
            };
            entries.push(StateEntry {
                key: full_key[self.prefix.len()..].to_string(),
                value: serde_json::from_str(&raw)?,
            });
        }

        tracing::debug!(
            namespace = %self.namespace,
            prefix = %prefix,
            count = entries.len(),
            "State fetch by prefix"
        );

        Ok(entries)
    }

    /// Replace the value stored under `key`.
    pub async fn save(&self, key: &str, value: &Value) -> StorageResult<()> {
        let full_key = self.full_key(key)?;
        let raw = serde_json::to_string(value)?;
        let _guard = self.lock.write().await;

        self.medium.write(&full_key, raw).await?;

        tracing::debug!(namespace = %self.namespace, key = %key, "State save");
        Ok(())
    }

    /// Typed variant of [`StateDb::save`].
    pub async fn save_as<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value)?;
        self.save(key, &value).await
    }

    /// Delete `key`. Succeeds when the key is absent.
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key)?;
        let _guard = self.lock.write().await;

        self.medium.delete(&full_key).await?;

        tracing::debug!(namespace = %self.namespace, key = %key, "State remove");
        Ok(())
    }

    /// Delete every entry of this namespace. Other namespaces are untouched.
    pub async fn clear(&self) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        self.clear_locked().await
    }

    /// Clear the namespace and store `value` under `key` as one exclusive step.
    ///
    /// No reader or writer sharing this instance runs between the clear and the save.
    pub async fn reset(&self, key: &str, value: &Value) -> StorageResult<()> {
        let full_key = self.full_key(key)?;
        let raw = serde_json::to_string(value)?;
        let _guard = self.lock.write().await;

        self.clear_locked().await?;
        self.medium.write(&full_key, raw).await?;

        tracing::debug!(namespace = %self.namespace, key = %key, "State reset");
        Ok(())
    }

    /// Keys currently stored in this namespace, sorted.
    pub async fn to_json(&self) -> StorageResult<Vec<String>> {
        let _guard = self.lock.read().await;

        let mut keys: Vec<String> = self
            .medium
            .list(&self.prefix)
            .await?
            .into_iter()
            .map(|full_key| full_key[self.prefix.len()..].to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear_locked(&self) -> StorageResult<()> {
        let start = Instant::now();
        let keys = self.medium.list(&self.prefix).await?;
        let count = keys.len();

        for key in keys {
            self.medium.delete(&key).await?;
        }

        tracing::info!(
            namespace = %self.namespace,
            removed = count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "State namespace cleared"
        );
        Ok(())
    }
}
