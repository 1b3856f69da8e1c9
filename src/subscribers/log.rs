//! # LogWriter: event renderer
//!
//! A subscriber that renders incoming [`Event`]s through `tracing`. Worker
//! output lines go to the `worker` target so they can be filtered
//! separately from supervisor diagnostics (`RUST_LOG=worker=info,rigvisor=warn`).
//!
//! ## Example output
//! ```text
//! INFO worker: [stderr] 12.34 Mh/s  [A1234]
//! INFO rigvisor: [started] pid=4242 generation=1
//! INFO rigvisor: [hashrate] 12.34 Mh/s [A1234]
//! WARN rigvisor: [error] Error: connection refused
//! WARN rigvisor: [restart-requested] reason=worker reported an error generation=1
//! INFO rigvisor: [restart-scheduled] reason=worker reported an error delay_ms=2000
//! INFO rigvisor: [stopped] pid=4242 exit=signal: 15 (SIGTERM)
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        let restart = e.restart.map(|r| r.as_str()).unwrap_or("");
        match e.kind {
            EventKind::LogLine => {
                let line = e.line.as_deref().unwrap_or("");
                match e.stream {
                    Some(stream) => info!(target: "worker", "[{stream}] {line}"),
                    None => info!("[marker] {line}"),
                }
            }
            EventKind::WorkerStarting => {
                info!("[starting] pid={:?} cmd={reason}", e.pid);
            }
            EventKind::WorkerStarted => {
                info!("[started] pid={:?} generation={:?}", e.pid, e.generation);
            }
            EventKind::WorkerStopped => {
                info!("[stopped] pid={:?} exit={reason}", e.pid);
            }
            EventKind::SpawnFailed => {
                warn!("[spawn-failed] {reason}");
            }
            EventKind::HashrateUpdated => {
                info!("[hashrate] {}", e.hashrate.as_deref().unwrap_or(""));
            }
            EventKind::ErrorDetected => {
                warn!("[error] {reason}");
            }
            EventKind::RestartRequested => {
                warn!(
                    "[restart-requested] reason={restart} generation={:?}",
                    e.generation
                );
            }
            EventKind::RestartScheduled => {
                info!(
                    "[restart-scheduled] reason={restart} delay_ms={:?}",
                    e.delay_ms
                );
            }
            EventKind::RestartSuppressed => {
                warn!("[restart-suppressed] reason={restart} (auto-restart disabled)");
            }
            EventKind::DonationEntered => {
                info!("[donation-entered] cmd={reason}");
            }
            EventKind::DonationExited => {
                info!("[donation-exited] cmd={reason}");
            }
            EventKind::DonationSkipped => {
                info!("[donation-skipped] {reason}");
            }
            EventKind::SubscriberOverflow => {
                warn!("[subscriber-overflow] {reason}");
            }
            EventKind::SubscriberPanicked => {
                warn!("[subscriber-panicked] {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
