//! Widget restoration
//!
//! A tracker remembers which widgets of one kind are open, as the command (and arguments)
//! that reopens each of them. Entries live in the state namespace under
//! `<tracker namespace>:<widget name>` and are replayed once at boot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::constants::{LAYOUT_KEY, NAMESPACE_SEPARATOR, VERSION_KEY};
use trellis_core::CommandRegistry;
use trellis_storage::{StateDb, StorageError, StorageResult};

use crate::commands::log_command_error;

/// How to reopen one widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreEntry {
    pub command: String,
    #[serde(default)]
    pub args: Value,
}

/// Counts of one tracker's replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerReport {
    pub restored: usize,
    pub dropped: usize,
}

/// Whether `key` lies under the entries of tracker `namespace`
fn claims_key(namespace: &str, key: &str) -> bool {
    key.strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with(NAMESPACE_SEPARATOR))
}

#[derive(Debug, Clone)]
pub struct RestoreTracker {
    store: StateDb,
    namespace: String,
    command: String,
}

impl RestoreTracker {
    /// `reserved` lists keys the tracker must never see as its own entries, on top of
    /// the version and layout keys.
    pub(crate) fn new(
        store: StateDb,
        namespace: &str,
        command: &str,
        reserved: &[&str],
    ) -> StorageResult<Self> {
        if namespace.is_empty() || namespace.contains(NAMESPACE_SEPARATOR) {
            return Err(StorageError::InvalidNamespace(format!(
                "Tracker namespace must be non-empty and free of '{}': {:?}",
                NAMESPACE_SEPARATOR, namespace
            )));
        }
        if let Some(key) = [VERSION_KEY, LAYOUT_KEY]
            .iter()
            .chain(reserved)
            .find(|key| claims_key(namespace, key))
        {
            return Err(StorageError::InvalidNamespace(format!(
                "Tracker namespace {:?} would claim the reserved key {:?}",
                namespace, key
            )));
        }
        Ok(Self {
            store,
            namespace: namespace.to_string(),
            command: command.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, name)
    }

    /// Remember an open widget, replacing any previous entry of the same name.
    pub async fn add(&self, name: &str, args: Value) -> StorageResult<()> {
        let entry = RestoreEntry {
            command: self.command.clone(),
            args,
        };
        self.store.save_as(&self.key_for(name), &entry).await
    }

    /// Forget a widget, e.g. once it is closed.
    pub async fn remove(&self, name: &str) -> StorageResult<()> {
        self.store.remove(&self.key_for(name)).await
    }

    /// Stored entries as `(widget name, entry)`, sorted by name. Malformed entries are
    /// returned as `None`.
    pub async fn entries(&self) -> StorageResult<Vec<(String, Option<RestoreEntry>)>> {
        let prefix = self.key_for("");
        let entries = self.store.fetch_by_prefix(&prefix).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let name = entry.key[prefix.len()..].to_string();
                (name, serde_json::from_value(entry.value).ok())
            })
            .collect())
    }

    /// Reopen every tracked widget. Entries that cannot be replayed are removed so they do
    /// not fail again on the next boot.
    #[tracing::instrument(skip(self, commands), fields(tracker = %self.namespace))]
    pub async fn restore(&self, commands: &dyn CommandRegistry) -> StorageResult<TrackerReport> {
        let mut report = TrackerReport::default();

        for (name, entry) in self.entries().await? {
            let Some(entry) = entry else {
                tracing::warn!(widget = %name, "Dropping malformed restore entry");
                self.drop_entry(&name).await;
                report.dropped += 1;
                continue;
            };

            match commands.execute(&entry.command, &entry.args).await {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    tracing::info_span!("restore_widget", widget = %name).in_scope(|| {
                        log_command_error(&e, "Dropping widget that could not be restored")
                    });
                    self.drop_entry(&name).await;
                    report.dropped += 1;
                }
            }
        }

        tracing::debug!(
            restored = report.restored,
            dropped = report.dropped,
            "Tracked widgets restored"
        );
        Ok(report)
    }

    async fn drop_entry(&self, name: &str) {
        if let Err(e) = self.remove(name).await {
            tracing::warn!(widget = %name, error = %e, "Failed to drop stale restore entry");
        }
    }
}
