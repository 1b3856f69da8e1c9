//! Worker lifecycle states.
//!
//! ```text
//! Stopped ──► Starting ──► Running ──► Stopping ──► Stopped
//!                │                                    ▲
//!                └──────────── forced kill ───────────┘
//! ```
//!
//! `Starting → Running` only happens once the process has been observed
//! alive after the spawn call returned.

use std::fmt;

/// Lifecycle state of the supervised worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl WorkerState {
    /// `true` for `Starting` and `Running`: a start request is a no-op.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, WorkerState::Starting | WorkerState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Stopped => "stopped",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
