//! Shared fixtures for boot integration tests

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use trellis_core::{Config, HostApplication, LayoutShell, RestoredLayout, Signal, SignalTrigger};
use trellis_restore::RestoreReport;
use trellis_restore::RestorerHandle;
use trellis_storage::{open_state_db, StateDb};

/// Open the `app-x` namespace on a local directory
pub async fn local_store(dir: &Path, version: &str) -> StateDb {
    let config = Config::new("app-x", version).with_local_dir(dir);
    open_state_db(&config).await.unwrap()
}

/// A shell whose default layout is a single launcher pane
pub struct AppShell {
    applied: Mutex<Vec<RestoredLayout>>,
    snapshot: Mutex<Value>,
    changes: watch::Sender<u64>,
}

impl AppShell {
    pub fn new() -> Arc<Self> {
        let (changes, _) = watch::channel(0);
        Arc::new(Self {
            applied: Mutex::new(Vec::new()),
            snapshot: Mutex::new(Value::Null),
            changes,
        })
    }

    pub fn applied(&self) -> Vec<RestoredLayout> {
        self.applied.lock().unwrap().clone()
    }

    pub fn rearrange(&self, snapshot: Value) {
        *self.snapshot.lock().unwrap() = snapshot;
        self.changes.send_modify(|generation| *generation += 1);
    }
}

#[async_trait]
impl LayoutShell for AppShell {
    async fn apply_layout(&self, layout: RestoredLayout) -> anyhow::Result<()> {
        self.applied.lock().unwrap().push(layout.clone());
        let snapshot = match layout {
            RestoredLayout::Saved(value) if value.get("panes").is_none() => {
                return Err(anyhow!("snapshot has no panes"));
            }
            RestoredLayout::Saved(value) => value,
            RestoredLayout::Default => json!({ "panes": ["launcher"] }),
        };
        self.rearrange(snapshot);
        Ok(())
    }

    fn current_snapshot(&self) -> Value {
        self.snapshot.lock().unwrap().clone()
    }

    fn layout_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

pub struct Host {
    version: String,
    started: Signal,
}

impl Host {
    pub fn booting(version: &str) -> (SignalTrigger, Host) {
        let (trigger, started) = Signal::new();
        (
            trigger,
            Host {
                version: version.to_string(),
                started,
            },
        )
    }

    pub fn running(version: &str) -> Host {
        Host {
            version: version.to_string(),
            started: Signal::resolved(),
        }
    }
}

impl HostApplication for Host {
    fn version(&self) -> &str {
        &self.version
    }

    fn started(&self) -> Signal {
        self.started.clone()
    }
}

pub async fn wait_restored(handle: &RestorerHandle) -> RestoreReport {
    tokio::time::timeout(Duration::from_secs(2), handle.wait_restored())
        .await
        .expect("restorer did not restore in time")
        .expect("restorer stopped without restoring")
}

/// Poll the store until `key` holds `expected`.
pub async fn wait_for_value(store: &StateDb, key: &str, expected: &Value) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.fetch(key).await.unwrap().as_ref() == Some(expected) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} never became {}",
            key,
            expected
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
