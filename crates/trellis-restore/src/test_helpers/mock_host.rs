//! Mock shell, host application and commands

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use trellis_core::{
    CommandHandler, HostApplication, LayoutShell, RestoredLayout, Signal, SignalTrigger,
};

/// Shell that records applied layouts and lets tests drive layout changes
pub struct MockShell {
    applied: Mutex<Vec<RestoredLayout>>,
    snapshot: Mutex<Value>,
    changes: watch::Sender<u64>,
    reject_saved: AtomicBool,
}

impl MockShell {
    pub fn new() -> Arc<Self> {
        let (changes, _) = watch::channel(0);
        Arc::new(Self {
            applied: Mutex::new(Vec::new()),
            snapshot: Mutex::new(json!({ "panes": [] })),
            changes,
            reject_saved: AtomicBool::new(false),
        })
    }

    /// A shell that fails to apply any saved snapshot
    pub fn rejecting_saved() -> Arc<Self> {
        let shell = Self::new();
        shell.reject_saved.store(true, Ordering::SeqCst);
        shell
    }

    pub fn applied(&self) -> Vec<RestoredLayout> {
        self.applied.lock().unwrap().clone()
    }

    /// Rearrange the layout and notify subscribers.
    pub fn change_layout(&self, snapshot: Value) {
        *self.snapshot.lock().unwrap() = snapshot;
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Notify without changing the snapshot.
    pub fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }
}

#[async_trait]
impl LayoutShell for MockShell {
    async fn apply_layout(&self, layout: RestoredLayout) -> anyhow::Result<()> {
        self.applied.lock().unwrap().push(layout.clone());

        let snapshot = match layout {
            RestoredLayout::Saved(_) if self.reject_saved.load(Ordering::SeqCst) => {
                return Err(anyhow!("snapshot references unknown widgets"));
            }
            RestoredLayout::Saved(value) => value,
            RestoredLayout::Default => json!({ "panes": ["launcher"] }),
        };
        self.change_layout(snapshot);
        Ok(())
    }

    fn current_snapshot(&self) -> Value {
        self.snapshot.lock().unwrap().clone()
    }

    fn layout_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

pub struct TestHost {
    version: String,
    started: Signal,
}

impl TestHost {
    /// A host that has not started yet, and the trigger that starts it
    pub fn new(version: &str) -> (SignalTrigger, TestHost) {
        let (trigger, started) = Signal::new();
        (
            trigger,
            TestHost {
                version: version.to_string(),
                started,
            },
        )
    }

    pub fn already_started(version: &str) -> TestHost {
        TestHost {
            version: version.to_string(),
            started: Signal::resolved(),
        }
    }
}

impl HostApplication for TestHost {
    fn version(&self) -> &str {
        &self.version
    }

    fn started(&self) -> Signal {
        self.started.clone()
    }
}

/// Command that records the arguments it was executed with
pub struct RecordingCommand {
    id: String,
    calls: Mutex<Vec<Value>>,
    fail_on: Mutex<Option<Value>>,
}

impl RecordingCommand {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
        })
    }

    /// Fail whenever executed with exactly `args`.
    pub fn fail_on(&self, args: Value) {
        *self.fail_on.lock().unwrap() = Some(args);
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandHandler for RecordingCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        "Recording command"
    }

    async fn execute(&self, args: &Value) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(args.clone());
        if self.fail_on.lock().unwrap().as_ref() == Some(args) {
            return Err(anyhow!("widget could not be reopened"));
        }
        Ok(())
    }
}
