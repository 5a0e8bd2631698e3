//! Helpers behind the `trellis` binary.

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use trellis_restore::{GateOutcome, ResetReason};
use trellis_storage::StateDb;

/// Shorten to at most `max_len` characters, ending in "..." when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a value given on the command line. With `as_string` the input is stored verbatim
/// as a JSON string.
pub fn parse_value(raw: &str, as_string: bool) -> anyhow::Result<Value> {
    if as_string {
        return Ok(Value::String(raw.to_string()));
    }
    serde_json::from_str(raw)
        .with_context(|| format!("Value is not valid JSON (use --string to store text): {}", raw))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct KeyListing {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Keys of the namespace, optionally with a one-line preview of each value.
pub async fn list_keys(
    store: &StateDb,
    with_values: bool,
    preview_len: usize,
) -> anyhow::Result<Vec<KeyListing>> {
    if !with_values {
        let keys = store.to_json().await.context("List keys")?;
        return Ok(keys
            .into_iter()
            .map(|key| KeyListing { key, preview: None })
            .collect());
    }

    let entries = store.fetch_by_prefix("").await.context("Read entries")?;
    Ok(entries
        .into_iter()
        .map(|entry| KeyListing {
            key: entry.key,
            preview: Some(truncate_string(&entry.value.to_string(), preview_len)),
        })
        .collect())
}

/// Every entry of the namespace as one JSON object.
pub async fn export_namespace(store: &StateDb) -> anyhow::Result<Value> {
    let entries = store.fetch_by_prefix("").await.context("Read entries")?;

    let mut object = Map::new();
    for entry in entries {
        object.insert(entry.key, entry.value);
    }
    Ok(Value::Object(object))
}

/// Write the entries of an exported object into the namespace. Returns the number of keys.
pub async fn import_namespace(
    store: &StateDb,
    data: &Value,
    replace: bool,
) -> anyhow::Result<usize> {
    let object = data
        .as_object()
        .context("Import data must be a JSON object of key/value pairs")?;

    if replace {
        store.clear().await.context("Clear namespace before import")?;
    }
    for (key, value) in object {
        store
            .save(key, value)
            .await
            .with_context(|| format!("Save {}", key))?;
    }

    tracing::info!(
        namespace = %store.namespace(),
        keys = object.len(),
        replace,
        "Namespace imported"
    );
    Ok(object.len())
}

#[derive(Debug, Serialize)]
pub struct GateSummary {
    pub namespace: String,
    pub version: String,
    pub dry_run: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl GateSummary {
    pub fn new(store: &StateDb, version: &str, dry_run: bool, outcome: &GateOutcome) -> Self {
        let (label, reason, previous) = match outcome {
            GateOutcome::Kept => ("kept", None, None),
            GateOutcome::Reset(reason) => {
                let previous = match reason {
                    ResetReason::Mismatch { previous } => Some(previous.clone()),
                    _ => None,
                };
                ("reset", Some(reason.to_string()), previous)
            }
        };

        Self {
            namespace: store.namespace().to_string(),
            version: version.to_string(),
            dry_run,
            outcome: label,
            reason,
            previous,
        }
    }
}

/// Initialize tracing for the CLI. `RUST_LOG` wins over `default_filter`. Logs go to
/// stderr so command output stays machine-readable.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
