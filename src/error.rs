//! Error types used by the rigvisor runtime and its configuration layer.
//!
//! This module defines two main error enums:
//!
//! - [`SupervisorError`]: errors raised while driving the worker process.
//! - [`ConfigError`]: errors raised while loading or validating configuration.
//!
//! Both types provide `as_label` for logging. Note that most worker
//! misbehaviour (error markers, stalls, zero hashrate) is **not** an error at
//! this level: it is reported as an [`Event`](crate::Event) and handled by the
//! restart path.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by the supervisor.
///
/// These represent failures of the supervisor itself or of the OS process
/// facility it drives.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The worker executable could not be launched (missing, not executable, ...).
    ///
    /// A spawn failure is never retried automatically; the caller has to
    /// issue another explicit start.
    #[error("failed to launch worker {path:?}: {source}")]
    Spawn {
        /// Executable that failed to launch.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The spawned process did not expose a piped stream we asked for.
    #[error("worker {0} pipe was not captured")]
    MissingPipe(&'static str),

    /// The supervisor actor is gone (shut down or dropped).
    #[error("supervisor is closed")]
    Closed,
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use rigvisor::SupervisorError;
    ///
    /// assert_eq!(SupervisorError::Closed.as_label(), "supervisor_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Spawn { .. } => "worker_spawn_failed",
            SupervisorError::MissingPipe(_) => "worker_missing_pipe",
            SupervisorError::Closed => "supervisor_closed",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`FileConfig`](crate::FileConfig).
    #[error("cannot parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed fine but makes no sense (e.g. a zero-length donation phase).
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Invalid(_) => "config_invalid",
        }
    }
}
