//! # Supervisor: handle to the worker actor.
//!
//! [`Supervisor`] is a cheap, cloneable handle. Every call is a message to the
//! [`WorkerActor`](super::actor) that owns the process, so calls from different
//! tasks are serialized and never observe a half-finished transition.
//!
//! ## Architecture
//! ```text
//! Supervisor (clone) ──► mpsc<Command> ──► WorkerActor ──► WorkerHandle (child process)
//!                                              │  ▲
//!                          readers, timers ────┘  │ Signal
//!                          donation scheduler ────┘
//!                                              │
//!                                              └── publish(Event) ──► Bus ──► SubscriberSet
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use rigvisor::{Config, LogWriter, Subscribe, Supervisor, WorkerSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rigvisor::SupervisorError> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let spec = WorkerSpec::from_arg_string("/opt/rigs/ethash.rn", "-P stratum://pool:4444");
//!     sup.start(spec).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     sup.shutdown().await
//! }
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::SupervisorError;
use crate::events::{Bus, Event};
use crate::parser::HashSample;
use crate::worker::{WorkerSpec, WorkerState};

use super::actor::{Command, PolicyUpdate};
use super::builder::SupervisorBuilder;
use super::config::Config;

/// Result of [`Supervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was launched.
    Spawned { pid: Option<u32> },
    /// A worker was already starting or running; nothing changed.
    AlreadyActive,
}

/// Point-in-time view of the supervised worker.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub pid: Option<u32>,
    /// Generation of the most recent start.
    pub generation: u64,
    /// Spec the next restart would launch.
    pub spec: Option<WorkerSpec>,
    pub auto_restart: bool,
    /// A restart is waiting out its cooldown.
    pub restart_pending: bool,
    /// Time left until the pending restart starts the worker.
    pub restart_in: Option<Duration>,
    pub donation_active: bool,
    pub last_hashrate: Option<HashSample>,
    /// Consecutive zero samples counted so far.
    pub zero_samples: u32,
}

/// Handle to a running supervisor.
#[derive(Clone)]
pub struct Supervisor {
    tx: mpsc::Sender<Command>,
    bus: Bus,
}

impl Supervisor {
    /// Starts building a supervisor. See [`SupervisorBuilder::build`].
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new(tx: mpsc::Sender<Command>, bus: Bus) -> Self {
        Self { tx, bus }
    }

    /// Launches the worker.
    ///
    /// No-op ([`StartOutcome::AlreadyActive`]) while a worker is starting or
    /// running. Cancels a pending restart and closes the donation window.
    /// A launch failure is reported, never retried.
    pub async fn start(&self, spec: WorkerSpec) -> Result<StartOutcome, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start { spec, reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)?
    }

    /// Stops the worker and cancels a pending restart.
    ///
    /// Returns once the process is reaped or the forced kill was issued.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }

    /// Requests a restart of the last-known spec, subject to the restart policy.
    pub async fn restart(&self) -> Result<(), SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Restart { reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }

    pub async fn status(&self) -> Result<WorkerStatus, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }

    pub async fn set_auto_restart(&self, on: bool) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::AutoRestart(on)))
            .await
    }

    pub async fn set_max_zero_samples(&self, n: u32) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::MaxZeroSamples(n)))
            .await
    }

    pub async fn set_restart_cooldown(&self, d: Duration) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::RestartCooldown(d)))
            .await
    }

    /// Takes effect from the next start.
    pub async fn set_zero_output_grace(&self, d: Duration) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::ZeroOutputGrace(d)))
            .await
    }

    /// Takes effect from the next start. `Duration::ZERO` disables the detector.
    pub async fn set_stall_interval(&self, d: Duration) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::StallInterval(d)))
            .await
    }

    pub async fn set_share_only(&self, on: bool) -> Result<(), SupervisorError> {
        self.send(Command::Update(PolicyUpdate::ShareOnly(on)))
            .await
    }

    /// Receiver for every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    #[inline]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Stops the worker and ends the actor and every background task.
    ///
    /// Calls on any handle fail with [`SupervisorError::Closed`] afterwards.
    pub async fn shutdown(&self) -> Result<(), SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| SupervisorError::Closed)
    }

    async fn send(&self, cmd: Command) -> Result<(), SupervisorError> {
        self.tx.send(cmd).await.map_err(|_| SupervisorError::Closed)
    }
}
