//! Command table and the built-in state commands

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use trellis_core::constants::{CLEAR_STATE_COMMAND_ID, CLEAR_STATE_COMMAND_LABEL};
use trellis_core::{AppError, CommandHandler, CommandRegistry, ErrorMetadata, LogLevel};
use trellis_storage::StateDb;

/// In-process command registry.
///
/// Lookups take a shared lock; the handler runs after the lock is released, so a command
/// may itself register or execute other commands.
#[derive(Clone)]
pub struct CommandTable {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn CommandHandler>>>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registered `(id, label)` pairs, sorted by id
    pub async fn list(&self) -> Vec<(String, String)> {
        let handlers = self.handlers.read().await;

        let mut commands: Vec<(String, String)> = handlers
            .values()
            .map(|handler| (handler.id().to_string(), handler.label().to_string()))
            .collect();
        commands.sort();
        commands
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRegistry for CommandTable {
    async fn add_command(&self, handler: Arc<dyn CommandHandler>) -> Result<(), AppError> {
        let id = handler.id().to_string();
        let mut handlers = self.handlers.write().await;

        if handlers.contains_key(&id) {
            return Err(AppError::DuplicateCommand(id));
        }
        tracing::debug!(command = %id, "Command registered");
        handlers.insert(id, handler);
        Ok(())
    }

    async fn execute(&self, id: &str, args: &Value) -> Result<(), AppError> {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::CommandNotFound(id.to_string()))?
        };

        handler
            .execute(args)
            .await
            .map_err(|source| AppError::CommandFailed {
                id: id.to_string(),
                source,
            })
    }

    async fn has_command(&self, id: &str) -> bool {
        self.handlers.read().await.contains_key(id)
    }
}

/// Log a registry error at the level its metadata asks for.
pub(crate) fn log_command_error(error: &AppError, message: &str) {
    let code = error.error_code();
    let error_type = error.error_type();
    let recoverable = error.is_recoverable();
    let details = error.detailed_message();

    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(code, error_type, recoverable, error = %details, "{}", message);
        }
        LogLevel::Warn => {
            tracing::warn!(code, error_type, recoverable, error = %details, "{}", message);
        }
        LogLevel::Error => {
            tracing::error!(code, error_type, recoverable, error = %details, "{}", message);
        }
    }
}

/// Wipes every key of the namespace; the version record goes too, so the next boot resets.
pub struct ClearStateCommand {
    store: StateDb,
}

impl ClearStateCommand {
    pub fn new(store: StateDb) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for ClearStateCommand {
    fn id(&self) -> &str {
        CLEAR_STATE_COMMAND_ID
    }

    fn label(&self) -> &str {
        CLEAR_STATE_COMMAND_LABEL
    }

    async fn execute(&self, _args: &Value) -> anyhow::Result<()> {
        self.store.clear().await?;
        tracing::info!(namespace = %self.store.namespace(), "Application restore state cleared");
        Ok(())
    }
}
