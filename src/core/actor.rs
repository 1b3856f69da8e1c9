//! # WorkerActor: single owner of the worker lifecycle.
//!
//! All mutable state (process handle, parser buffers, watchdog counters,
//! restart sequence, donation window) lives on one task. Callers talk to it
//! through [`Command`]s; background tasks (output readers, timers, donation
//! scheduler) through [`Signal`]s. Nothing is shared, so no locks.
//!
//! ## Loop
//! ```text
//! loop (biased) {
//!   ├─► Command           start / stop / restart / status / policy update / shutdown
//!   ├─► Starting?         start confirmation → Running, reset watchdog counters
//!   ├─► Signal            output chunk → parser → events, watchdogs, restart requests
//!   │                     grace elapsed / stall tick / donation phase
//!   ├─► child exit        → Stopped, WorkerStopped (UnexpectedExit request if opted in)
//!   └─► cooldown elapsed  → start pending spec
//! }
//! ```
//!
//! ## Rules
//! - `stop` awaits termination (bounded wait, then kill) before the next message is read
//! - Signals tagged with an older generation are dropped
//! - A restart sequence admits no other request until it started the worker again
//! - Donation transitions force auto-restart for their own restart only

use std::future;
use std::ops::ControlFlow;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind, OutputStream};
use crate::parser::{HashSample, OutputParser, Record};
use crate::policies::RestartPolicy;
use crate::watchdog::WatchdogSet;
use crate::worker::{
    ArgSnapshot, WorkerHandle, WorkerSpec, WorkerState, describe_exit, split_args,
};

use super::config::Config;
use super::donation::{DonationPhase, DonationWindow};
use super::restart::{Admission, RestartReason, RestartRequest, RestartScheduler};
use super::signal::Signal;
use super::supervisor::{StartOutcome, WorkerStatus};

/// Caller requests, each answered through its oneshot.
pub(crate) enum Command {
    Start {
        spec: WorkerSpec,
        reply: oneshot::Sender<Result<StartOutcome, SupervisorError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Restart {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<WorkerStatus>,
    },
    Update(PolicyUpdate),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Live policy change. Grace and stall interval apply from the next start.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PolicyUpdate {
    AutoRestart(bool),
    MaxZeroSamples(u32),
    RestartCooldown(Duration),
    ZeroOutputGrace(Duration),
    StallInterval(Duration),
    ShareOnly(bool),
}

pub(crate) struct WorkerActor {
    cfg: Config,
    bus: Bus,
    /// Supervisor lifetime; worker tokens derive from it.
    token: CancellationToken,
    commands: mpsc::Receiver<Command>,
    signals: mpsc::Receiver<Signal>,
    signals_tx: mpsc::Sender<Signal>,

    state: WorkerState,
    worker: Option<WorkerHandle>,
    /// Watchdog timers of the current lifetime (child of the worker token).
    watchdog_token: Option<CancellationToken>,
    /// Last-known spec; what a restart starts.
    spec: Option<WorkerSpec>,
    generation: u64,

    parser: OutputParser,
    watchdogs: WatchdogSet,
    restarts: RestartScheduler,
    window: DonationWindow,
    snapshot: ArgSnapshot,
    last_sample: Option<HashSample>,
}

impl WorkerActor {
    pub fn new(
        cfg: Config,
        bus: Bus,
        token: CancellationToken,
        commands: mpsc::Receiver<Command>,
        signals: mpsc::Receiver<Signal>,
        signals_tx: mpsc::Sender<Signal>,
    ) -> Self {
        Self {
            parser: OutputParser::new(cfg.share_only),
            watchdogs: WatchdogSet::new(cfg.max_zero_samples),
            restarts: RestartScheduler::new(cfg.restart_cooldown),
            cfg,
            bus,
            token,
            commands,
            signals,
            signals_tx,
            state: WorkerState::Stopped,
            worker: None,
            watchdog_token: None,
            spec: None,
            generation: 0,
            window: DonationWindow::default(),
            snapshot: ArgSnapshot::default(),
            last_sample: None,
        }
    }

    /// Runs until shutdown or until every [`Supervisor`](crate::Supervisor) handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        self.teardown().await;
                        break;
                    };
                    if self.on_command(cmd).await.is_break() {
                        break;
                    }
                }
                _ = future::ready(()), if self.state == WorkerState::Starting => {
                    self.confirm_start().await;
                }
                Some(signal) = self.signals.recv() => {
                    self.on_signal(signal).await;
                }
                status = wait_exit(&mut self.worker) => {
                    self.on_exit(status).await;
                }
                _ = sleep_until(self.restarts.deadline()) => {
                    self.on_cooldown_elapsed();
                }
            }
        }
    }

    async fn on_command(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::Start { spec, reply } => {
                let _ = reply.send(self.start(spec));
            }
            Command::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::Restart { reply } => {
                self.request_restart(RestartRequest::new(RestartReason::Manual, self.generation))
                    .await;
                let _ = reply.send(());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Update(update) => self.apply(update),
            Command::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // === Lifecycle ===

    /// Explicit start. User intent wins over a pending restart and the donation window.
    fn start(&mut self, spec: WorkerSpec) -> Result<StartOutcome, SupervisorError> {
        if self.state.is_active() {
            debug!(state = %self.state, "start ignored; worker already active");
            return Ok(StartOutcome::AlreadyActive);
        }
        if let Some(pending) = self.restarts.cancel() {
            info!(reason = %pending.reason, "pending restart cancelled by explicit start");
        }
        if self.window.is_active() || self.snapshot.is_saved() {
            info!("donation window closed by explicit start");
            self.window.close();
            self.snapshot.clear();
        }
        let pid = self.spawn(spec)?;
        Ok(StartOutcome::Spawned { pid })
    }

    /// Launches `spec` as a new generation and arms its watchdogs.
    fn spawn(&mut self, spec: WorkerSpec) -> Result<Option<u32>, SupervisorError> {
        self.generation += 1;
        let generation = self.generation;
        self.parser.reset();
        self.parser.set_share_only(self.cfg.share_only);
        self.last_sample = None;

        let handle = match WorkerHandle::spawn(
            &spec,
            generation,
            self.token.child_token(),
            &self.signals_tx,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, label = e.as_label(), generation, "worker spawn failed");
                self.state = WorkerState::Stopped;
                self.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_reason(e.to_string())
                        .with_generation(generation),
                );
                self.spec = Some(spec);
                return Err(e);
            }
        };

        let pid = handle.pid();
        let timers = handle.token().child_token();
        self.watchdogs.arm(
            generation,
            self.cfg.grace_period(),
            self.cfg.stall_period(),
            &timers,
            &self.signals_tx,
        );
        self.watchdog_token = Some(timers);
        self.state = WorkerState::Starting;

        info!(?pid, generation, cmd = %spec, "worker spawned");
        self.bus.publish(
            Event::new(EventKind::WorkerStarting)
                .with_pid(pid)
                .with_generation(generation)
                .with_reason(spec.to_string()),
        );
        self.worker = Some(handle);
        self.spec = Some(spec);
        Ok(pid)
    }

    /// Starting → Running once the OS still reports the process alive.
    async fn confirm_start(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            self.state = WorkerState::Stopped;
            return;
        };
        if !worker.confirm_alive() {
            let status = worker.wait().await.ok();
            self.on_exit(status).await;
            return;
        }

        self.state = WorkerState::Running;
        self.watchdogs.reset_counters();
        let (pid, generation) = (worker.pid(), worker.generation());
        info!(?pid, generation, "worker running");
        self.bus.publish(
            Event::new(EventKind::WorkerStarted)
                .with_pid(pid)
                .with_generation(generation),
        );
        self.bus.publish(Event::marker("worker started"));
    }

    async fn stop(&mut self) {
        if let Some(pending) = self.restarts.cancel() {
            info!(reason = %pending.reason, "pending restart cancelled by stop");
        }
        self.terminate().await;
    }

    /// Terminates the current process, if any, and waits for it.
    async fn terminate(&mut self) {
        let Some(handle) = self.worker.take() else {
            self.state = WorkerState::Stopped;
            return;
        };
        self.watchdog_token = None;
        self.state = WorkerState::Stopping;

        let (pid, generation) = (handle.pid(), handle.generation());
        let status = handle.terminate(self.cfg.stop_timeout).await;

        self.state = WorkerState::Stopped;
        self.watchdogs.reset();
        self.last_sample = None;

        let exit = describe_exit(status.as_ref());
        info!(?pid, generation, %exit, "worker stopped");
        self.publish_stopped(pid, generation, exit);
    }

    /// The process ended without being asked to.
    async fn on_exit(&mut self, status: Option<ExitStatus>) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        if let Some(timers) = self.watchdog_token.take() {
            timers.cancel();
        }
        let was_running = self.state == WorkerState::Running;
        self.state = WorkerState::Stopped;
        self.watchdogs.reset();
        self.last_sample = None;

        let (pid, generation) = (handle.pid(), handle.generation());
        drop(handle);

        let exit = describe_exit(status.as_ref());
        warn!(?pid, generation, %exit, "worker exited");
        self.publish_stopped(pid, generation, exit);

        // A worker that never got past Starting would only die again.
        if self.cfg.restart_on_exit && was_running {
            self.request_restart(RestartRequest::new(RestartReason::UnexpectedExit, generation))
                .await;
        }
    }

    fn publish_stopped(&self, pid: Option<u32>, generation: u64, exit: String) {
        self.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_pid(pid)
                .with_generation(generation)
                .with_reason(exit),
        );
        self.bus.publish(Event::marker("worker stopped"));
    }

    async fn teardown(&mut self) {
        self.restarts.cancel();
        self.terminate().await;
        self.token.cancel();
        info!("supervisor shut down");
    }

    // === Restart path ===

    async fn request_restart(&mut self, req: RestartRequest) {
        match self.restarts.admit(&req, self.generation) {
            Admission::Accepted => {}
            Admission::InFlight => {
                debug!(reason = %req.reason, "restart already pending; request coalesced");
                return;
            }
            Admission::Stale => {
                debug!(
                    reason = %req.reason,
                    generation = req.generation,
                    current = self.generation,
                    "stale restart request dropped"
                );
                return;
            }
        }

        warn!(reason = %req.reason, generation = req.generation, "restart requested");
        self.bus.publish(
            Event::new(EventKind::RestartRequested)
                .with_restart(req.reason)
                .with_generation(req.generation),
        );

        if !self.cfg.restart.is_auto() {
            self.terminate().await;
            warn!(reason = %req.reason, "auto-restart disabled; worker left stopped");
            self.bus.publish(
                Event::new(EventKind::RestartSuppressed)
                    .with_restart(req.reason)
                    .with_generation(req.generation),
            );
            return;
        }

        let Some(spec) = self.spec.clone() else {
            debug!(reason = %req.reason, "no worker spec known; nothing to restart");
            return;
        };
        self.terminate().await;

        let delay = self.restarts.schedule(spec, req.reason);
        info!(reason = %req.reason, ?delay, "restart scheduled");
        self.bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_restart(req.reason)
                .with_delay(delay)
                .with_generation(req.generation),
        );
    }

    fn on_cooldown_elapsed(&mut self) {
        let Some(pending) = self.restarts.take_due() else {
            return;
        };
        info!(reason = %pending.reason, "cooldown elapsed; starting worker");
        if let Err(e) = self.spawn(pending.spec) {
            debug!(error = %e, "restart abandoned");
        }
    }

    /// Runs one restart with auto-restart forced on, then puts the user's policy back.
    async fn forced_restart(&mut self, reason: RestartReason) {
        let user_policy = std::mem::replace(&mut self.cfg.restart, RestartPolicy::Auto);
        self.request_restart(RestartRequest::new(reason, self.generation))
            .await;
        self.cfg.restart = user_policy;
    }

    // === Signals ===

    async fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Output {
                generation,
                stream,
                chunk,
            } => self.on_output(generation, stream, &chunk).await,
            Signal::GraceElapsed { generation } => {
                if self.is_live(generation) {
                    debug!(generation, "zero-output grace elapsed");
                    self.watchdogs.on_grace_elapsed();
                }
            }
            Signal::StallTick { generation } => self.on_stall_tick(generation).await,
            Signal::Donation(phase) => match phase {
                DonationPhase::Enter => self.enter_donation().await,
                DonationPhase::Exit => self.exit_donation().await,
            },
        }
    }

    /// `true` while `generation` is the process currently owned.
    fn is_live(&self, generation: u64) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.generation() == generation)
    }

    async fn on_output(&mut self, generation: u64, stream: OutputStream, chunk: &[u8]) {
        if generation != self.generation {
            return;
        }
        match stream {
            OutputStream::Stdout => {
                for line in self.parser.feed_stdout(chunk) {
                    self.bus
                        .publish(Event::new(EventKind::LogLine).with_line(line, Some(stream)));
                }
            }
            OutputStream::Stderr => {
                if let Some(record) = self.parser.feed_stderr(chunk) {
                    self.on_record(generation, record).await;
                }
            }
        }
    }

    /// One logical stderr record. Raises at most one restart request; a
    /// worker-reported error outranks sustained zero hashrate.
    async fn on_record(&mut self, generation: u64, record: Record) {
        for line in record.lines {
            self.bus.publish(
                Event::new(EventKind::LogLine).with_line(line, Some(OutputStream::Stderr)),
            );
        }

        let live = self.is_live(generation);
        let mut zero_tripped = false;

        if let Some(sample) = record.sample {
            self.bus.publish(
                Event::new(EventKind::HashrateUpdated)
                    .with_hashrate(sample.to_string(), sample.rate_mhs)
                    .with_generation(generation),
            );
            zero_tripped = live && self.watchdogs.on_sample(sample.rate_mhs);
            self.last_sample = Some(sample);
        }

        let (reason, detail) = match (record.error, zero_tripped) {
            (Some(text), _) => {
                warn!(generation, error = %text, "worker reported an error");
                (RestartReason::WorkerError, text)
            }
            (None, true) => {
                warn!(
                    generation,
                    threshold = self.cfg.max_zero_samples,
                    "sustained zero hashrate"
                );
                let reason = RestartReason::SustainedZeroHashrate;
                (reason, reason.as_str().to_owned())
            }
            (None, false) => return,
        };
        self.bus.publish(
            Event::new(EventKind::ErrorDetected)
                .with_reason(detail)
                .with_generation(generation),
        );

        if live {
            self.request_restart(RestartRequest::new(reason, generation))
                .await;
        }
    }

    async fn on_stall_tick(&mut self, generation: u64) {
        if !self.is_live(generation) || self.state != WorkerState::Running {
            return;
        }
        if !self.watchdogs.on_stall_tick() {
            return;
        }
        warn!(generation, period = ?self.cfg.stall_interval, "no hashrate sample during stall period");
        self.bus.publish(
            Event::new(EventKind::ErrorDetected)
                .with_reason(RestartReason::NoOutputActivity.as_str())
                .with_generation(generation),
        );
        self.request_restart(RestartRequest::new(RestartReason::NoOutputActivity, generation))
            .await;
    }

    // === Donation window ===

    async fn enter_donation(&mut self) {
        if self.window.is_active() {
            debug!("donation window already active");
            return;
        }
        if self.state != WorkerState::Running {
            self.skip_donation("worker not running");
            return;
        }
        let Some(spec) = self.spec.clone() else {
            self.skip_donation("no worker spec");
            return;
        };
        let Some(profile) = self.cfg.donation.profile_for(spec.path()) else {
            self.skip_donation("no matching profile");
            return;
        };
        let alternate = spec.with_args(split_args(&profile.args));

        if !self.snapshot.save(spec.args()) {
            debug!("argument snapshot already held; keeping it");
        }
        self.window.open();
        info!(cmd = %alternate, "entering donation window");
        self.bus
            .publish(Event::new(EventKind::DonationEntered).with_reason(alternate.to_string()));
        self.spec = Some(alternate);
        self.forced_restart(RestartReason::DonationEnter).await;
    }

    async fn exit_donation(&mut self) {
        if !self.window.is_active() {
            debug!("donation exit without an active window");
            return;
        }
        let since = self.window.started_at();
        self.window.close();

        let Some(args) = self.snapshot.restore() else {
            warn!("no argument snapshot; keeping current arguments");
            return;
        };
        let Some(restored) = self.spec.as_ref().map(|s| s.with_args(args)) else {
            return;
        };
        info!(cmd = %restored, ?since, "leaving donation window");
        self.bus
            .publish(Event::new(EventKind::DonationExited).with_reason(restored.to_string()));
        self.spec = Some(restored.clone());

        if self.restarts.replace_spec(restored) {
            debug!("pending restart will use the restored arguments");
            return;
        }
        if !self.state.is_active() {
            self.skip_donation("worker not running");
            return;
        }
        self.forced_restart(RestartReason::DonationExit).await;
    }

    fn skip_donation(&self, why: &'static str) {
        info!(why, "donation transition skipped");
        self.bus
            .publish(Event::new(EventKind::DonationSkipped).with_reason(why));
    }

    // === Queries and policy ===

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state,
            pid: self.worker.as_ref().and_then(WorkerHandle::pid),
            generation: self.generation,
            spec: self.spec.clone(),
            auto_restart: self.cfg.restart.is_auto(),
            restart_pending: self.restarts.is_pending(),
            restart_in: self.restarts.remaining(),
            donation_active: self.window.is_active(),
            last_hashrate: self.last_sample.clone(),
            zero_samples: self.watchdogs.zero_count(),
        }
    }

    fn apply(&mut self, update: PolicyUpdate) {
        match update {
            PolicyUpdate::AutoRestart(on) => self.cfg.restart = RestartPolicy::from_flag(on),
            PolicyUpdate::MaxZeroSamples(n) => {
                self.cfg.max_zero_samples = n;
                self.watchdogs.set_max_zero_samples(n);
            }
            PolicyUpdate::RestartCooldown(d) => {
                self.cfg.restart_cooldown = d;
                self.restarts.set_cooldown(d);
            }
            PolicyUpdate::ZeroOutputGrace(d) => self.cfg.zero_output_grace = d,
            PolicyUpdate::StallInterval(d) => self.cfg.stall_interval = d,
            PolicyUpdate::ShareOnly(on) => {
                self.cfg.share_only = on;
                self.parser.set_share_only(on);
            }
        }
        debug!(?update, "policy updated");
    }
}

/// Resolves when the owned process exits; never resolves without one.
async fn wait_exit(worker: &mut Option<WorkerHandle>) -> Option<ExitStatus> {
    match worker {
        Some(w) => w.wait().await.ok(),
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => time::sleep_until(d).await,
        None => future::pending().await,
    }
}
