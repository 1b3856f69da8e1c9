//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: worker starting, started, stopped, spawn failure
//! - **Telemetry events**: log lines, hashrate updates, worker-reported errors
//! - **Restart events**: requests, scheduled restarts, suppressed restarts
//! - **Donation events**: window entered, exited, skipped
//!
//! The [`Event`] struct carries additional metadata such as timestamps, pid,
//! generation, hashrate text and restart reasons.
//!
//! ## Ordering guarantees
//! `seq` comes from one process-wide counter, so sorting by it restores publish order.
//!
//! ## Example
//! ```rust
//! use rigvisor::{Event, EventKind, RestartReason};
//!
//! let ev = Event::new(EventKind::RestartRequested)
//!     .with_restart(RestartReason::WorkerError)
//!     .with_generation(3);
//!
//! assert_eq!(ev.kind, EventKind::RestartRequested);
//! assert_eq!(ev.restart, Some(RestartReason::WorkerError));
//! assert_eq!(ev.generation, Some(3));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::RestartReason;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and reason ("full", "closed")
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// Worker process spawned, waiting for start confirmation.
    ///
    /// Sets:
    /// - `pid`, `generation`
    /// - `reason`: command line
    WorkerStarting,

    /// Worker confirmed running (Starting → Running).
    ///
    /// Sets:
    /// - `pid`, `generation`
    WorkerStarted,

    /// Worker stopped (explicit stop, kill, or unexpected exit).
    ///
    /// Sets:
    /// - `pid`, `generation`
    /// - `reason`: exit description
    WorkerStopped,

    /// Worker executable could not be launched.
    ///
    /// Sets:
    /// - `reason`: OS error
    SpawnFailed,

    // === Telemetry ===
    /// One line of worker output for display.
    ///
    /// Sets:
    /// - `line`: trimmed text
    /// - `stream`: stdout / stderr, or `None` for supervisor markers
    LogLine,

    /// New hashrate sample.
    ///
    /// Sets:
    /// - `hashrate`: display text, e.g. `"12.34 Mh/s [A1234]"`
    /// - `rate_mhs`: numeric value
    /// - `generation`
    HashrateUpdated,

    /// Worker output contained an error marker, or the worker stalled.
    ///
    /// Sets:
    /// - `reason`: offending record / description
    /// - `generation`
    ErrorDetected,

    // === Restart path ===
    /// A watchdog, the parser, or a caller asked for a restart.
    ///
    /// Sets:
    /// - `restart`: reason
    /// - `generation`: worker lifetime the request was raised for
    RestartRequested,

    /// Worker stopped; next start after the cooldown.
    ///
    /// Sets:
    /// - `restart`, `delay_ms`, `generation`
    RestartScheduled,

    /// Auto-restart is disabled: worker stopped, no automatic start.
    ///
    /// Sets:
    /// - `restart`, `generation`
    RestartSuppressed,

    // === Donation window ===
    /// Alternate arguments applied.
    ///
    /// Sets:
    /// - `reason`: alternate command line
    DonationEntered,

    /// User arguments restored.
    ///
    /// Sets:
    /// - `reason`: restored command line
    DonationExited,

    /// Phase boundary reached but no swap applied.
    ///
    /// Sets:
    /// - `reason`: why ("worker not running", "no matching profile", ...)
    DonationSkipped,
}

/// Which worker stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// One bus event. Which optional fields are set depends on `kind`.
#[derive(Clone, Debug)]
pub struct Event {
    /// Publish order across the process.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Human-readable reason (errors, exit status, command lines).
    pub reason: Option<Arc<str>>,
    /// Restart reason for restart-path events.
    pub restart: Option<RestartReason>,
    /// Log line text.
    pub line: Option<Arc<str>>,
    /// Source stream of a log line.
    pub stream: Option<OutputStream>,
    /// Hashrate display text.
    pub hashrate: Option<Arc<str>>,
    /// Hashrate in Mh/s.
    pub rate_mhs: Option<f64>,
    /// OS process id.
    pub pid: Option<u32>,
    /// Worker lifetime the event belongs to.
    pub generation: Option<u64>,
    /// Restart cooldown in milliseconds (compact).
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Stamps `kind` with the next sequence number and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reason: None,
            restart: None,
            line: None,
            stream: None,
            hashrate: None,
            rate_mhs: None,
            pid: None,
            generation: None,
            delay_ms: None,
        }
    }

    /// Free-form detail: exit status, error line, command line.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a restart reason.
    #[inline]
    pub fn with_restart(mut self, reason: RestartReason) -> Self {
        self.restart = Some(reason);
        self
    }

    /// Attaches a log line and its source stream.
    #[inline]
    pub fn with_line(mut self, line: impl Into<Arc<str>>, stream: Option<OutputStream>) -> Self {
        self.line = Some(line.into());
        self.stream = stream;
        self
    }

    /// Attaches a hashrate sample.
    #[inline]
    pub fn with_hashrate(mut self, text: impl Into<Arc<str>>, rate_mhs: f64) -> Self {
        self.hashrate = Some(text.into());
        self.rate_mhs = Some(rate_mhs);
        self
    }

    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Supervisor marker line (`worker started`, `worker stopped`, ...).
    #[inline]
    pub fn marker(text: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::LogLine).with_line(text, None)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::WorkerStarted);
        let b = Event::new(EventKind::WorkerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::RestartScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn marker_has_no_stream() {
        let ev = Event::marker("worker started");
        assert_eq!(ev.kind, EventKind::LogLine);
        assert_eq!(ev.line.as_deref(), Some("worker started"));
        assert_eq!(ev.stream, None);
    }
}
