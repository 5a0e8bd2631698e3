//! Collaborator interfaces
//!
//! The state layer never talks to the application shell, the host or the command system
//! directly. It goes through these traits, which the surrounding application implements.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::AppError;
use crate::layout::RestoredLayout;
use crate::signal::Signal;

/// The host application being restored.
pub trait HostApplication: Send + Sync {
    /// Version string of the running application, compared against the stored record.
    fn version(&self) -> &str;

    /// Resolves once, after the host finished its own boot sequence.
    fn started(&self) -> Signal;
}

/// The layout shell that owns widget arrangement.
#[async_trait]
pub trait LayoutShell: Send + Sync {
    /// Apply a saved snapshot or the default arrangement. Must be idempotent.
    async fn apply_layout(&self, layout: RestoredLayout) -> anyhow::Result<()>;

    /// Serialize the current arrangement.
    fn current_snapshot(&self) -> Value;

    /// Change notifications. The value is a generation counter bumped on every layout
    /// change; only "has changed since last seen" matters to subscribers.
    fn layout_changes(&self) -> watch::Receiver<u64>;
}

/// A command the application can execute by id.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable label (menus, palette)
    fn label(&self) -> &str;

    async fn execute(&self, args: &Value) -> anyhow::Result<()>;
}

/// Command registry of the host application.
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    /// Register a handler. Fails with `DuplicateCommand` if the id is taken.
    async fn add_command(&self, handler: Arc<dyn CommandHandler>) -> Result<(), AppError>;

    /// Execute a registered command.
    async fn execute(&self, id: &str, args: &Value) -> Result<(), AppError>;

    async fn has_command(&self, id: &str) -> bool;
}
