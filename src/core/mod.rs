//! # Supervisor runtime.
//!
//! - [`Supervisor`] / [`SupervisorBuilder`]: public handle and its construction
//! - `actor`: the task that owns the worker process and every piece of state
//! - `restart`: admission, coalescing and cooldown of restart requests
//! - donation scheduler: phase timer for the alternate argument window
//! - [`Config`] / [`FileConfig`]: policy settings and their TOML form
//! - [`wait_for_shutdown_signal`]: OS signal helper for binaries

mod actor;
mod builder;
mod config;
mod donation;
mod restart;
mod shutdown;
mod signal;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{AlternateProfile, Config, DonationConfig, FileConfig, FileDonation, FileWorker};
pub use donation::DonationPhase;
pub use restart::{RestartReason, RestartRequest};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
pub(crate) use signal::Signal;
pub use supervisor::{StartOutcome, Supervisor, WorkerStatus};
