//! # rigvisor
//!
//! **Rigvisor** supervises one long-running GPU miner process. It launches the
//! worker, reads its output to judge whether it is alive and productive, and
//! restarts it when it is not.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Supervisor (cloneable handle)
//!        │ mpsc<Command>
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WorkerActor (single owner, one task)                             │
//! │  - WorkerHandle   child process + lifetime token                  │
//! │  - OutputParser   stdout lines, stderr CRLF records               │
//! │  - WatchdogSet    zero-output grace, zero hashrate, stall         │
//! │  - RestartScheduler  coalescing + fixed cooldown                  │
//! │  - DonationWindow + ArgSnapshot                                   │
//! └──────┬──────────────────────▲─────────────────────────────────────┘
//!        │ publish(Event)       │ Signal (generation-tagged)
//!        │                      ├── stdout / stderr readers
//!        │                      ├── grace timer, stall ticker
//!        │                      └── donation scheduler
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                        subscriber_listener ──► SubscriberSet
//!                                          ┌─────────┼─────────┐
//!                                          ▼         ▼         ▼
//!                                      LogWriter  log view  tray icon
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! Stopped ──start()──► Starting ──alive──► Running ──stop()/restart──► Stopping ──► Stopped
//!    ▲                     │                  │
//!    └─────── exit ────────┴────── exit ──────┘   (UnexpectedExit restart only if opted in)
//!
//! restart request (error marker, zero hashrate, stall, exit, manual, donation)
//!   ├─ pending sequence or stale generation → dropped
//!   ├─ RestartPolicy::Manual → stop, RestartSuppressed
//!   └─ RestartPolicy::Auto   → stop, RestartScheduled, cooldown, start(last spec)
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Start, stop and restart one worker process.                 | [`Supervisor`], [`WorkerSpec`]           |
//! | **Telemetry**     | Hashrate, share tags and error markers from worker output.  | [`parser::OutputParser`], [`HashSample`] |
//! | **Watchdogs**     | Zero hashrate, stalled output, warmup grace.                | [`watchdog::WatchdogSet`]                |
//! | **Policies**      | Auto-restart on or off, fixed cooldown.                     | [`RestartPolicy`], [`RestartReason`]     |
//! | **Subscriber API**| Hook into every event (log view, notifications).           | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Configuration** | Defaults, TOML file, donation window.                       | [`Config`], [`FileConfig`]               |
//! | **Errors**        | Typed errors for launching and configuration.               | [`SupervisorError`], [`ConfigError`]     |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use rigvisor::{Config, EventKind, Supervisor, WorkerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.max_zero_samples = 3;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn rigvisor::Subscribe>> = vec![Arc::new(rigvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn rigvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!     let mut events = sup.subscribe();
//!
//!     sup.start(WorkerSpec::from_arg_string("/opt/rigs/ethash.rn", "-P stratum://pool:4444"))
//!         .await?;
//!
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == EventKind::HashrateUpdated {
//!             println!("{}", ev.hashrate.as_deref().unwrap_or("-"));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
pub mod parser;
mod policies;
mod subscribers;
pub mod watchdog;
mod worker;

// ---- Public re-exports ----

pub use core::{
    AlternateProfile, Config, DonationConfig, DonationPhase, FileConfig, FileDonation, FileWorker,
    RestartReason, RestartRequest, ShutdownSignal, StartOutcome, Supervisor, SupervisorBuilder,
    WorkerStatus, wait_for_shutdown_signal,
};
pub use error::{ConfigError, SupervisorError};
pub use events::{Bus, Event, EventKind, OutputStream};
pub use parser::HashSample;
pub use policies::RestartPolicy;
pub use subscribers::{Subscribe, SubscriberSet};
pub use worker::{ArgSnapshot, WorkerSpec, WorkerState, split_args};

// Optional: built-in tracing renderer for events.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
