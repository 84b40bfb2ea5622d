//! Error types used by the agentvisor runtime.
//!
//! Four enums cover the failure surface:
//!
//! - [`WorkerError`] — failures of one worker's start/restart path.
//! - [`RegistryError`] — registry construction failures.
//! - [`ConfigError`] — configuration load/parse/validation failures.
//! - [`RuntimeError`] — failures of the supervisor process itself.
//!
//! Each type provides `as_label()` returning a short stable snake_case
//! string for logs. Note what is *not* here: `stop()` has no error type,
//! because shutdown must be total; stop-path problems are logged and
//! swallowed, and a forced kill after a graceful-stop timeout is an outcome
//! ([`StopOutcome::Forced`](crate::workers::StopOutcome)), not an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by a single worker's start/restart path.
///
/// These never propagate out of the supervisor's sweep; they are recorded
/// against the worker's snapshot and logged.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// `start()` was called while the worker was already starting or running.
    #[error("worker {name:?} is already running")]
    AlreadyRunning {
        /// Worker name.
        name: String,
    },

    /// The restart budget was exhausted inside the current window.
    ///
    /// The worker has moved to `Failed` and will not be auto-restarted until
    /// an operator intervenes.
    #[error("worker {name:?} exceeded its restart budget ({max_restarts} per window)")]
    RestartBudgetExceeded {
        /// Worker name.
        name: String,
        /// The configured ceiling that was hit.
        max_restarts: u32,
    },

    /// The OS failed to spawn the worker process.
    #[error("failed to spawn worker {name:?}: {source}")]
    Spawn {
        /// Worker name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::AlreadyRunning { .. } => "worker_already_running",
            WorkerError::RestartBudgetExceeded { .. } => "worker_restart_budget_exceeded",
            WorkerError::Spawn { .. } => "worker_spawn_failed",
        }
    }
}

/// Errors produced while building the worker registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Two specs in the configuration share the same name.
    #[error("duplicate worker name {name:?}")]
    DuplicateName {
        /// The colliding name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateName { .. } => "registry_duplicate_name",
        }
    }
}

/// Errors produced by the configuration loader.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read or the bootstrap default could not
    /// be written.
    #[error("config io error at {path:?}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("config parse error at {path:?}: {source}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The config file parsed but violates a validation rule.
    #[error("invalid config at {path:?}: {reason}")]
    Invalid {
        /// Path of the offending file.
        path: PathBuf,
        /// Human-readable rule violation.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io_error",
            ConfigError::Parse { .. } => "config_parse_error",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }

    /// True when falling back to built-in defaults is permitted.
    ///
    /// Parse and validation failures fall back; an I/O failure means the
    /// environment is broken in a way defaults cannot paper over.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, ConfigError::Io { .. })
    }
}

/// Errors raised by the supervisor process itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Registering OS signal listeners failed.
    #[error("failed to install signal listeners: {source}")]
    SignalSetup {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The registry could not be built from the loaded specs.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration failed in a way that could not fall back to defaults.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SignalSetup { .. } => "runtime_signal_setup",
            RuntimeError::Registry(e) => e.as_label(),
            RuntimeError::Config(e) => e.as_label(),
        }
    }
}
