//! Error types for the servcheck harness.
//!
//! Two families live here:
//!
//! - [`Error`]: general harness errors (fixtures, suite files, HTTP transport).
//! - [`ProcessError`]: everything that can go wrong while supervising the
//!   server under test or an external tool process.
//!
//! ```rust
//! use servcheck_common::{Error, Result, ResultExt};
//!
//! fn load_fixture() -> Result<String> {
//!     Err(Error::not_found("index.html"))
//! }
//!
//! fn caller() -> Result<String> {
//!     load_fixture().context("Failed to prepare scenario")
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for harness operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested resource (fixture, suite, variable) was not found.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Invalid input or configuration.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A suite or harness configuration file could not be parsed.
    #[error("Configuration error in {file}: {reason}")]
    Config { file: String, reason: String },

    /// HTTP request could not be built or sent.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Internal error (shouldn't happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Supervision error bubbled up from the process layer.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a NotFound error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a Config error for the given file.
    pub fn config(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Adds context to an error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Process Supervision Errors
// ==============================================================================

/// Errors raised while supervising an external process.
///
/// `id` is a human-readable handle for the process: the config artifact the
/// server was started with, or the tool binary name.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process not ready: {id} - no connection accepted on {address} within {waited:?}")]
    NotReady {
        id: String,
        address: String,
        waited: Duration,
    },

    #[error("Process exited before becoming ready: {id} - exit code {exit_code:?}")]
    ExitedEarly { id: String, exit_code: Option<i32> },

    #[error("Process exited while checks were running: {id} - {status}")]
    ExitedDuringRun { id: String, status: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process timeout: {id} - {operation}")]
    Timeout { id: String, operation: String },

    #[error("Process signal failed: {id} - {reason}")]
    Signal { id: String, reason: String },

    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },

    #[error("Log file error: {id} - {reason}")]
    LoggingError { id: String, reason: String },

    #[error("Task panicked while process '{id}' was live: {message}")]
    TaskPanic { id: String, message: String },
}

impl ProcessError {
    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn not_ready(id: impl Into<String>, address: impl Into<String>, waited: Duration) -> Self {
        Self::NotReady {
            id: id.into(),
            address: address.into(),
            waited,
        }
    }

    pub fn exited_early(id: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ExitedEarly {
            id: id.into(),
            exit_code,
        }
    }

    pub fn exited_during_run(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::ExitedDuringRun {
            id: id.into(),
            status: status.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            id: id.into(),
            operation: operation.into(),
        }
    }

    pub fn signal(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Signal {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn logging(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoggingError {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn task_panic(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskPanic {
            id: id.into(),
            message: message.into(),
        }
    }

    /// True when the error happened before the process could serve requests.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed { .. }
                | Self::NotReady { .. }
                | Self::ExitedEarly { .. }
                | Self::Configuration { .. }
                | Self::LoggingError { .. }
        )
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
