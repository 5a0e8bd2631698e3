//! Error types module
//!
//! This module provides the application-level error type used by configuration loading,
//! the command registry and the session composition. Storage failures have their own
//! type (`StorageError`) in the trellis-storage crate; they are converted at the edges.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like registering a command twice
    Debug,
    /// Warning level - for issues the caller works around, like an unknown restore command
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "COMMAND_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation can succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    #[error("Command '{id}' failed")]
    CommandFailed {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("State storage error: {0}")]
    Storage(String),
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::Configuration(_) => ("CONFIGURATION_ERROR", false, LogLevel::Error),
        AppError::CommandNotFound(_) => ("COMMAND_NOT_FOUND", false, LogLevel::Warn),
        AppError::DuplicateCommand(_) => ("DUPLICATE_COMMAND", false, LogLevel::Debug),
        AppError::CommandFailed { .. } => ("COMMAND_FAILED", true, LogLevel::Warn),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Configuration(_) => "Configuration",
            AppError::CommandNotFound(_) => "CommandNotFound",
            AppError::DuplicateCommand(_) => "DuplicateCommand",
            AppError::CommandFailed { .. } => "CommandFailed",
            AppError::Storage(_) => "Storage",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}
