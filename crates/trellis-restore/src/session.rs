//! Boot-time wiring of the state layer
//!
//! A [`Session`] owns the gated state store of one application run, the running layout
//! restorer and the widget trackers. Booting never fails because durable state is
//! unusable: if the namespace cannot be reset, the session continues on an in-memory store
//! and reports itself ephemeral.

use std::collections::HashMap;
use std::sync::Arc;
use trellis_core::{AppError, CommandRegistry, HostApplication, LayoutShell};
use trellis_storage::StateDb;

use crate::commands::{log_command_error, ClearStateCommand};
use crate::restorer::{LayoutRestorer, RestorerHandle};
use crate::tracker::RestoreTracker;
use crate::version_gate::{GateOutcome, GatedStore, VersionGate};

pub struct SessionBuilder {
    store: StateDb,
    shell: Arc<dyn LayoutShell>,
    commands: Arc<dyn CommandRegistry>,
    version_key: Option<String>,
    layout_key: Option<String>,
    trackers: Vec<(String, String)>,
}

impl SessionBuilder {
    pub fn version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = Some(key.into());
        self
    }

    pub fn layout_key(mut self, key: impl Into<String>) -> Self {
        self.layout_key = Some(key.into());
        self
    }

    /// Track widgets of `namespace`, reopened through `command`.
    pub fn track(mut self, namespace: impl Into<String>, command: impl Into<String>) -> Self {
        self.trackers.push((namespace.into(), command.into()));
        self
    }

    #[tracing::instrument(
        skip_all,
        fields(namespace = %self.store.namespace(), version = %host.version())
    )]
    pub async fn boot(self, host: &dyn HostApplication) -> Result<Session, AppError> {
        let mut gate = VersionGate::new(host.version());
        if let Some(key) = &self.version_key {
            gate = gate.with_key(key.clone());
        }

        let (gated, ephemeral) = match gate.open(self.store.clone()).await {
            Ok(gated) => (gated, false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "State namespace could not be reset; continuing with in-memory state"
                );
                let fallback = StateDb::in_memory(self.store.namespace())?;
                (gate.open(fallback).await?, true)
            }
        };
        let GatedStore { store, outcome } = gated;

        let clear = Arc::new(ClearStateCommand::new(store.clone()));
        if let Err(e) = self.commands.add_command(clear).await {
            log_command_error(&e, "Clear-state command not registered");
        }

        let mut restorer = LayoutRestorer::new(store.clone(), self.shell, host.started())
            .with_commands(self.commands)
            .reserve_key(gate.key());
        if let Some(key) = self.layout_key {
            restorer = restorer.with_key(key);
        }

        let mut trackers = HashMap::new();
        for (namespace, command) in &self.trackers {
            let tracker = restorer.track(namespace, command)?;
            trackers.insert(namespace.clone(), tracker);
        }

        let restorer = restorer.start();

        tracing::info!(
            outcome = ?outcome,
            ephemeral = ephemeral,
            backend = %store.backend_type(),
            "State session booted"
        );

        Ok(Session {
            store,
            outcome,
            ephemeral,
            restorer,
            trackers,
        })
    }
}

#[derive(Debug)]
pub struct Session {
    store: StateDb,
    outcome: GateOutcome,
    ephemeral: bool,
    restorer: RestorerHandle,
    trackers: HashMap<String, RestoreTracker>,
}

impl Session {
    pub fn builder(
        store: StateDb,
        shell: Arc<dyn LayoutShell>,
        commands: Arc<dyn CommandRegistry>,
    ) -> SessionBuilder {
        SessionBuilder {
            store,
            shell,
            commands,
            version_key: None,
            layout_key: None,
            trackers: Vec::new(),
        }
    }

    /// Gate `store` against the host's version, register the clear-state command and start
    /// the layout restorer.
    pub async fn boot(
        store: StateDb,
        host: &dyn HostApplication,
        shell: Arc<dyn LayoutShell>,
        commands: Arc<dyn CommandRegistry>,
    ) -> Result<Session, AppError> {
        Self::builder(store, shell, commands).boot(host).await
    }

    /// The gated store every component of this run should use
    pub fn store(&self) -> &StateDb {
        &self.store
    }

    pub fn outcome(&self) -> &GateOutcome {
        &self.outcome
    }

    /// `true` when durable state was unusable and the session runs on in-memory state
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn restorer(&self) -> &RestorerHandle {
        &self.restorer
    }

    pub fn tracker(&self, namespace: &str) -> Option<&RestoreTracker> {
        self.trackers.get(namespace)
    }

    pub async fn shutdown(self) {
        self.restorer.shutdown().await;
    }
}
