//! Layout restorer
//!
//! Restores the shell's layout once at boot and keeps the persisted snapshot current
//! afterwards. The restorer runs as a single background task:
//!
//! 1. fetch the saved snapshot, concurrently with waiting for the host to start
//! 2. once both are done, apply the snapshot (or the default layout) exactly once
//! 3. replay tracked widgets, then resolve the `restored` signal
//! 4. save the current snapshot after every layout change
//!
//! Nothing is saved before the initial apply, so the stored snapshot can never be
//! overwritten by the half-built layout of an application that is still booting.
//! Change notifications arriving while a save is in flight coalesce into one more save.
//!
//! Shutdown: [`RestorerHandle::shutdown`] stops the task after any in-flight save.
//! Dropping the handle stops it as well.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use trellis_core::constants::LAYOUT_KEY;
use trellis_core::{
    CommandRegistry, LayoutShell, LayoutSource, RestoreSkipped, RestoredLayout, Signal,
    SignalTrigger,
};
use trellis_storage::{StateDb, StorageResult};

use crate::tracker::{RestoreTracker, TrackerReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorerPhase {
    /// Not started
    Idle,
    /// Reading the saved snapshot
    Fetching,
    /// Snapshot read; waiting for the host to start
    Waiting,
    /// Handing the layout to the shell
    Applying,
    /// Restored; saving on every layout change
    Active,
    /// Task finished, after shutdown or a host that never started
    Stopped,
}

/// What the boot-time restore did
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreReport {
    pub source: LayoutSource,
    /// Set when the default layout was used
    pub skipped: Option<RestoreSkipped>,
    pub widgets: TrackerReport,
}

pub struct LayoutRestorer {
    store: StateDb,
    shell: Arc<dyn LayoutShell>,
    started: Signal,
    key: String,
    commands: Option<Arc<dyn CommandRegistry>>,
    trackers: Vec<RestoreTracker>,
    reserved: Vec<String>,
}

impl LayoutRestorer {
    /// `started` is the host's start signal; the layout is applied only after it resolves.
    pub fn new(store: StateDb, shell: Arc<dyn LayoutShell>, started: Signal) -> Self {
        Self {
            store,
            shell,
            started,
            key: LAYOUT_KEY.to_string(),
            commands: None,
            trackers: Vec::new(),
            reserved: Vec::new(),
        }
    }

    /// Persist the snapshot under a key other than the default layout key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Registry used to replay tracked widgets.
    pub fn with_commands(mut self, commands: Arc<dyn CommandRegistry>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Keep tracker namespaces from covering `key`, e.g. a custom version key.
    pub fn reserve_key(mut self, key: impl Into<String>) -> Self {
        self.reserved.push(key.into());
        self
    }

    /// Track widgets reopened by `command`. Their entries are replayed after the layout is
    /// applied and before the restorer reports itself restored.
    ///
    /// The namespace may not cover the layout key or a reserved key, so set those first.
    pub fn track(&mut self, namespace: &str, command: &str) -> StorageResult<RestoreTracker> {
        let mut reserved: Vec<&str> = self.reserved.iter().map(String::as_str).collect();
        reserved.push(&self.key);
        let tracker = RestoreTracker::new(self.store.clone(), namespace, command, &reserved)?;
        self.trackers.push(tracker.clone());
        Ok(tracker)
    }

    /// Spawn the restorer task.
    pub fn start(self) -> RestorerHandle {
        let (phase_tx, phase_rx) = watch::channel(RestorerPhase::Idle);
        let (report_tx, report_rx) = watch::channel(None);
        let (restored_trigger, restored) = Signal::new();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            self.run(phase_tx, report_tx, restored_trigger, shutdown_rx)
                .await;
        });

        RestorerHandle {
            phase: phase_rx,
            report: report_rx,
            restored,
            shutdown_tx,
            task: Some(task),
        }
    }

    #[tracing::instrument(skip_all, fields(namespace = %self.store.namespace(), key = %self.key))]
    async fn run(
        self,
        phase_tx: watch::Sender<RestorerPhase>,
        report_tx: watch::Sender<Option<RestoreReport>>,
        restored: SignalTrigger,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let boot = self.boot(&phase_tx, &report_tx, &restored);

        let changes = tokio::select! {
            changes = boot => changes,
            _ = shutdown_rx.recv() => {
                tracing::debug!("Layout restorer stopped before the layout was restored");
                None
            }
        };

        if let Some(mut changes) = changes {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            tracing::debug!("Layout shell closed its change notifications");
                            break;
                        }
                        changes.borrow_and_update();
                        self.save_layout().await;
                    }
                }
            }
        }

        phase_tx.send_replace(RestorerPhase::Stopped);
        tracing::debug!("Layout restorer stopped");
    }

    /// Returns the change subscription to follow once restored, or `None` if the host
    /// never started.
    async fn boot(
        &self,
        phase_tx: &watch::Sender<RestorerPhase>,
        report_tx: &watch::Sender<Option<RestoreReport>>,
        restored: &SignalTrigger,
    ) -> Option<watch::Receiver<u64>> {
        phase_tx.send_replace(RestorerPhase::Fetching);

        let fetch = async {
            let fetched = self.fetch_layout().await;
            phase_tx.send_replace(RestorerPhase::Waiting);
            fetched
        };
        let ((layout, skipped), started) = tokio::join!(fetch, self.started.wait());

        if !started {
            tracing::warn!("Host application dropped its start signal; layout not restored");
            return None;
        }

        phase_tx.send_replace(RestorerPhase::Applying);
        let (source, skipped) = self.apply(layout, skipped).await;

        // changes up to and including the apply are never saved
        let mut changes = self.shell.layout_changes();
        changes.borrow_and_update();

        let widgets = self.restore_widgets().await;

        let report = RestoreReport {
            source,
            skipped,
            widgets,
        };
        tracing::info!(
            source = ?report.source,
            skipped = ?report.skipped,
            widgets_restored = report.widgets.restored,
            widgets_dropped = report.widgets.dropped,
            "Layout restored"
        );
        report_tx.send_replace(Some(report));
        phase_tx.send_replace(RestorerPhase::Active);
        restored.resolve();

        Some(changes)
    }

    async fn fetch_layout(&self) -> (RestoredLayout, Option<RestoreSkipped>) {
        match self.store.fetch(&self.key).await {
            Ok(Some(Value::Null)) | Ok(None) => {
                (RestoredLayout::Default, Some(RestoreSkipped::Absent))
            }
            Ok(Some(snapshot)) => (RestoredLayout::Saved(snapshot), None),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch saved layout; using default");
                (RestoredLayout::Default, Some(RestoreSkipped::FetchFailed))
            }
        }
    }

    async fn apply(
        &self,
        layout: RestoredLayout,
        skipped: Option<RestoreSkipped>,
    ) -> (LayoutSource, Option<RestoreSkipped>) {
        let source = layout.source();

        match self.shell.apply_layout(layout).await {
            Ok(()) => (source, skipped),
            Err(e) if source == LayoutSource::Saved => {
                tracing::warn!(error = %e, "Saved layout could not be applied; using default");
                if let Err(e) = self.shell.apply_layout(RestoredLayout::Default).await {
                    tracing::error!(error = %e, "Default layout could not be applied");
                }
                (LayoutSource::Default, Some(RestoreSkipped::ApplyFailed))
            }
            Err(e) => {
                tracing::error!(error = %e, "Default layout could not be applied");
                (source, skipped)
            }
        }
    }

    async fn restore_widgets(&self) -> TrackerReport {
        let mut total = TrackerReport::default();
        if self.trackers.is_empty() {
            return total;
        }

        let Some(commands) = &self.commands else {
            tracing::warn!(
                trackers = self.trackers.len(),
                "No command registry configured; tracked widgets not restored"
            );
            return total;
        };

        for tracker in &self.trackers {
            match tracker.restore(commands.as_ref()).await {
                Ok(report) => {
                    total.restored += report.restored;
                    total.dropped += report.dropped;
                }
                Err(e) => {
                    tracing::warn!(
                        tracker = %tracker.namespace(),
                        error = %e,
                        "Failed to read tracked widgets"
                    );
                }
            }
        }
        total
    }

    async fn save_layout(&self) {
        let snapshot = self.shell.current_snapshot();
        match self.store.save(&self.key, &snapshot).await {
            Ok(()) => tracing::debug!("Layout saved"),
            Err(e) => tracing::warn!(error = %e, "Failed to save layout"),
        }
    }
}

/// Handle to a running restorer
pub struct RestorerHandle {
    phase: watch::Receiver<RestorerPhase>,
    report: watch::Receiver<Option<RestoreReport>>,
    restored: Signal,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl RestorerHandle {
    pub fn phase(&self) -> RestorerPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase transitions.
    pub fn phase_changes(&self) -> watch::Receiver<RestorerPhase> {
        self.phase.clone()
    }

    /// Resolves after the layout is applied and tracked widgets are replayed.
    pub fn restored(&self) -> Signal {
        self.restored.clone()
    }

    /// The boot-time report, once restored.
    pub fn report(&self) -> Option<RestoreReport> {
        self.report.borrow().clone()
    }

    /// Wait until restored. `None` if the restorer stopped without restoring.
    pub async fn wait_restored(&self) -> Option<RestoreReport> {
        if self.restored.wait().await {
            self.report()
        } else {
            None
        }
    }

    /// Stop the restorer and wait for its task to finish.
    pub async fn shutdown(mut self) {
        tracing::info!("Initiating layout restorer shutdown");
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Layout restorer task failed");
            }
        }
    }
}

impl std::fmt::Debug for RestorerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestorerHandle")
            .field("phase", &self.phase())
            .field("restored", &self.restored.is_resolved())
            .finish()
    }
}
