//! Version gate
//!
//! Guards a namespace against state written by a different application version. Opening a
//! store through the gate reads the version record; anything but an exact match wipes the
//! namespace and writes a fresh record before the store is handed out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};
use trellis_core::constants::VERSION_KEY;
use trellis_storage::{StateDb, StorageResult};

/// Stored under the version key of every gated namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
}

/// Why a namespace was reset when opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    /// No usable record (absent, or without a string `version` field)
    Missing,
    /// A record from another version
    Mismatch { previous: String },
    /// Reading the record failed
    Unreadable,
}

impl ResetReason {
    fn previous(&self) -> &str {
        match self {
            ResetReason::Mismatch { previous } => previous,
            _ => "unknown",
        }
    }
}

impl Display for ResetReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResetReason::Missing => write!(f, "no version record"),
            ResetReason::Mismatch { previous } => write!(f, "version record from {}", previous),
            ResetReason::Unreadable => write!(f, "version record unreadable"),
        }
    }
}

/// Result of gating a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The record matched; nothing was written
    Kept,
    /// The namespace was cleared and a fresh record written
    Reset(ResetReason),
}

impl GateOutcome {
    pub fn was_reset(&self) -> bool {
        matches!(self, GateOutcome::Reset(_))
    }
}

/// A store that passed through the gate, plus what the gate did to it.
#[derive(Debug, Clone)]
pub struct GatedStore {
    pub store: StateDb,
    pub outcome: GateOutcome,
}

impl GatedStore {
    pub fn into_store(self) -> StateDb {
        self.store
    }
}

#[derive(Debug, Clone)]
pub struct VersionGate {
    version: String,
    key: String,
}

impl VersionGate {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            key: VERSION_KEY.to_string(),
        }
    }

    /// Use a key other than the default version key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Decide what opening `store` would do, without writing anything.
    pub async fn inspect(&self, store: &StateDb) -> GateOutcome {
        match store.fetch(&self.key).await {
            Ok(Some(record)) => match stored_version(&record) {
                Some(previous) if previous == self.version => GateOutcome::Kept,
                Some(previous) => GateOutcome::Reset(ResetReason::Mismatch {
                    previous: previous.to_string(),
                }),
                None => GateOutcome::Reset(ResetReason::Missing),
            },
            Ok(None) => GateOutcome::Reset(ResetReason::Missing),
            Err(e) => {
                tracing::warn!(
                    namespace = %store.namespace(),
                    error = %e,
                    "Failed to read state version record"
                );
                GateOutcome::Reset(ResetReason::Unreadable)
            }
        }
    }

    /// Validate the namespace, resetting it unless the stored version matches.
    ///
    /// Fails only when the reset itself fails; the caller then has no trustworthy store.
    #[tracing::instrument(
        skip(self, store),
        fields(namespace = %store.namespace(), version = %self.version)
    )]
    pub async fn open(&self, store: StateDb) -> StorageResult<GatedStore> {
        let outcome = self.inspect(&store).await;

        if let GateOutcome::Reset(reason) = &outcome {
            tracing::info!(
                reason = %reason,
                "Upgraded state from {} to {}; resetting namespace",
                reason.previous(),
                self.version
            );
            let record = serde_json::to_value(VersionRecord {
                version: self.version.clone(),
            })?;
            store.reset(&self.key, &record).await?;
        } else {
            tracing::debug!("State version record matches");
        }

        Ok(GatedStore { store, outcome })
    }
}

fn stored_version(record: &Value) -> Option<&str> {
    record.get("version").and_then(Value::as_str)
}
