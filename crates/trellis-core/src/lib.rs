//! Trellis Core Library
//!
//! This crate provides configuration, error types, layout types, readiness signals and the
//! collaborator interfaces (host application, layout shell, command registry) that are
//! shared across all Trellis components.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod layout;
pub mod signal;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{CommandHandler, CommandRegistry, HostApplication, LayoutShell};
pub use layout::{LayoutSource, RestoreSkipped, RestoredLayout};
pub use signal::{Signal, SignalTrigger};
pub use storage_types::StorageBackend;
// Note: StateDb, StateMedium and StorageError live in the trellis-storage crate
