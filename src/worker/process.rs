//! # Owned worker process.
//!
//! [`WorkerHandle`] exclusively owns one live OS process together with the
//! cancellation token bound to its lifetime. Output readers and watchdog
//! timers spawned for this process hang off that token, so dropping or
//! terminating the handle tears them down deterministically.
//!
//! ## Stop sequence
//! ```text
//! terminate(timeout)
//!   ├─► cancel lifetime token (readers, grace timer, stall ticker)
//!   ├─► SIGTERM (unix) / TerminateProcess (other)
//!   ├─► wait up to `timeout`
//!   │     ├─ exited   → Some(status)
//!   │     └─ timeout  → SIGKILL + reap
//!   └─► returns only once the process is reaped or the kill was issued
//! ```

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::Signal;
use crate::error::SupervisorError;
use crate::events::OutputStream;

use super::spec::WorkerSpec;

/// Read buffer size for one output chunk.
const CHUNK_SIZE: usize = 4096;

/// Exclusive owner of one worker process.
pub(crate) struct WorkerHandle {
    child: Child,
    pid: Option<u32>,
    generation: u64,
    token: CancellationToken,
}

impl WorkerHandle {
    /// Spawns the worker with piped stdout/stderr and starts both readers.
    ///
    /// `token` becomes the lifetime token of this process; the caller derives
    /// it from the supervisor token so teardown reaches it.
    pub fn spawn(
        spec: &WorkerSpec,
        generation: u64,
        token: CancellationToken,
        signals: &mpsc::Sender<Signal>,
    ) -> Result<Self, SupervisorError> {
        let mut child = Command::new(spec.path())
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                path: spec.path().to_path_buf(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(SupervisorError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(SupervisorError::MissingPipe("stderr"))?;

        spawn_reader(
            stdout,
            OutputStream::Stdout,
            generation,
            token.clone(),
            signals.clone(),
        );
        spawn_reader(
            stderr,
            OutputStream::Stderr,
            generation,
            token.clone(),
            signals.clone(),
        );

        Ok(Self {
            pid: child.id(),
            child,
            generation,
            token,
        })
    }

    #[inline]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Lifetime token; watchdog timers for this process derive from it.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Start confirmation: `true` while the OS still reports the process alive.
    ///
    /// An already exited process is not confirmed; its exit status stays
    /// available to [`WorkerHandle::wait`].
    pub fn confirm_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(e) => {
                warn!(error = %e, pid = ?self.pid, "cannot query worker status");
                false
            }
        }
    }

    /// Waits for the process to exit on its own. Cancel-safe.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Stops the process: termination signal, bounded wait, then forced kill.
    ///
    /// Returns the exit status when it could be collected.
    pub async fn terminate(mut self, timeout: Duration) -> Option<ExitStatus> {
        self.token.cancel();
        self.request_exit();

        match time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!(error = %e, pid = ?self.pid, "wait on worker failed; killing");
                self.force_kill().await
            }
            Err(_elapsed) => {
                warn!(pid = ?self.pid, ?timeout, "worker ignored termination; killing");
                self.force_kill().await
            }
        }
    }

    #[cfg(unix)]
    fn request_exit(&mut self) {
        use nix::sys::signal::{Signal as UnixSignal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id() else { return };
        let Ok(raw) = i32::try_from(pid) else { return };
        if let Err(e) = kill(Pid::from_raw(raw), UnixSignal::SIGTERM) {
            debug!(error = %e, pid, "SIGTERM not delivered");
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, pid = ?self.pid, "termination request failed");
        }
    }

    async fn force_kill(&mut self) -> Option<ExitStatus> {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, pid = ?self.pid, "kill failed");
        }
        self.child.try_wait().ok().flatten()
    }
}

/// Forwards raw chunks of one output stream to the actor until EOF or cancellation.
fn spawn_reader<R>(
    mut reader: R,
    stream: OutputStream,
    generation: u64,
    token: CancellationToken,
    signals: mpsc::Sender<Signal>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = tokio::select! {
                _ = token.cancelled() => break,
                res = reader.read(&mut buf) => match res {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        debug!(error = %e, %stream, generation, "worker stream read failed");
                        break;
                    }
                },
            };
            let signal = Signal::Output {
                generation,
                stream,
                chunk: buf[..n].to_vec(),
            };
            tokio::select! {
                _ = token.cancelled() => break,
                res = signals.send(signal) => if res.is_err() { break },
            }
        }
    });
}

/// Human-readable exit description (`exit status: 1`, `signal: 9 (SIGKILL)`, ...).
pub(crate) fn describe_exit(status: Option<&ExitStatus>) -> String {
    match status {
        Some(s) => s.to_string(),
        None => "unknown".to_string(),
    }
}
