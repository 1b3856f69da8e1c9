//! # Restart scheduling and coalescing.
//!
//! Every restart, whatever raised it, goes through [`RestartScheduler`]:
//!
//! ```text
//! RestartRequest{reason, generation}
//!     │
//!     ├─ sequence already pending?        → coalesced (dropped)
//!     ├─ generation != current generation → stale (dropped)
//!     └─ admitted
//!          ├─ policy Manual → stop, RestartSuppressed
//!          └─ policy Auto   → stop, PendingRestart{deadline = now + cooldown, spec}
//!                                  └─ deadline reached → start(spec)
//! ```
//!
//! The pending sequence carries the spec it will start, so arguments swapped
//! while it waits (donation exit) are applied by replacing that spec.

use std::fmt;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::worker::WorkerSpec;

/// Why a restart was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// A stderr record carried an error marker.
    WorkerError,
    /// Too many consecutive zero hashrate samples.
    SustainedZeroHashrate,
    /// No hashrate sample during a full stall period.
    NoOutputActivity,
    /// The worker exited without being asked to.
    UnexpectedExit,
    /// [`Supervisor::restart`](crate::Supervisor::restart).
    Manual,
    /// Switching to the alternate argument set.
    DonationEnter,
    /// Switching back to the user's arguments.
    DonationExit,
}

impl RestartReason {
    /// Short human-readable description.
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartReason::WorkerError => "worker reported an error",
            RestartReason::SustainedZeroHashrate => "sustained zero hashrate",
            RestartReason::NoOutputActivity => "no output activity",
            RestartReason::UnexpectedExit => "unexpected exit",
            RestartReason::Manual => "manual",
            RestartReason::DonationEnter => "donation window entered",
            RestartReason::DonationExit => "donation window exited",
        }
    }
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to restart the worker lifetime `generation`.
#[derive(Debug, Clone)]
pub struct RestartRequest {
    pub reason: RestartReason,
    pub at: SystemTime,
    pub generation: u64,
}

impl RestartRequest {
    pub fn new(reason: RestartReason, generation: u64) -> Self {
        Self {
            reason,
            at: SystemTime::now(),
            generation,
        }
    }
}

/// Outcome of admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// A restart sequence is already waiting out its cooldown.
    InFlight,
    /// Raised for a worker lifetime that is already gone.
    Stale,
}

/// Restart sequence waiting out its cooldown.
#[derive(Debug, Clone)]
pub struct PendingRestart {
    pub deadline: Instant,
    pub spec: WorkerSpec,
    pub reason: RestartReason,
}

/// Holds at most one pending restart sequence.
#[derive(Debug)]
pub struct RestartScheduler {
    cooldown: Duration,
    pending: Option<PendingRestart>,
}

impl RestartScheduler {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            pending: None,
        }
    }

    /// Decides whether `req` may start a new restart sequence.
    pub fn admit(&self, req: &RestartRequest, current_generation: u64) -> Admission {
        if self.pending.is_some() {
            Admission::InFlight
        } else if req.generation != current_generation {
            Admission::Stale
        } else {
            Admission::Accepted
        }
    }

    /// Parks `spec` until the cooldown elapses. Returns the cooldown used.
    pub fn schedule(&mut self, spec: WorkerSpec, reason: RestartReason) -> Duration {
        self.pending = Some(PendingRestart {
            deadline: Instant::now() + self.cooldown,
            spec,
            reason,
        });
        self.cooldown
    }

    /// Drops the pending sequence, if any.
    pub fn cancel(&mut self) -> Option<PendingRestart> {
        self.pending.take()
    }

    /// Takes the pending sequence once its deadline has passed.
    pub fn take_due(&mut self) -> Option<PendingRestart> {
        match &self.pending {
            Some(p) if p.deadline <= Instant::now() => self.pending.take(),
            _ => None,
        }
    }

    /// Swaps the spec a pending sequence will start. Returns `false` if none.
    pub fn replace_spec(&mut self, spec: WorkerSpec) -> bool {
        match &mut self.pending {
            Some(p) => {
                p.spec = spec;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Remaining cooldown of the pending sequence.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(args: &str) -> WorkerSpec {
        WorkerSpec::from_arg_string("/opt/rigs/ethash.rn", args)
    }

    #[test]
    fn admission_rules() {
        let mut s = RestartScheduler::new(Duration::from_secs(2));
        let req = RestartRequest::new(RestartReason::WorkerError, 4);

        assert_eq!(s.admit(&req, 4), Admission::Accepted);
        assert_eq!(s.admit(&req, 5), Admission::Stale);

        s.schedule(spec("-a"), req.reason);
        let late = RestartRequest::new(RestartReason::SustainedZeroHashrate, 4);
        assert_eq!(s.admit(&late, 4), Admission::InFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_becomes_due_after_cooldown() {
        let mut s = RestartScheduler::new(Duration::from_secs(2));
        assert_eq!(s.schedule(spec("-a"), RestartReason::Manual), Duration::from_secs(2));
        assert!(s.take_due().is_none());

        tokio::time::advance(Duration::from_secs(2)).await;
        let due = s.take_due().unwrap();
        assert_eq!(due.spec, spec("-a"));
        assert!(!s.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_spec_updates_pending_sequence() {
        let mut s = RestartScheduler::new(Duration::ZERO);
        assert!(!s.replace_spec(spec("-x")));

        s.schedule(spec("-donate"), RestartReason::DonationEnter);
        assert!(s.replace_spec(spec("-user")));
        assert_eq!(s.cancel().unwrap().spec, spec("-user"));
        assert!(s.deadline().is_none());
    }
}
