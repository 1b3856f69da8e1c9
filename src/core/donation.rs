//! # Donation (mode-switch) window.
//!
//! A background task alternates between a long normal phase and a short
//! alternate phase, sending one [`DonationPhase`] signal per boundary:
//!
//! ```text
//! ──── normal_phase ────► Enter ── alternate_phase ──► Exit ──── normal_phase ────► Enter ...
//! ```
//!
//! The task only keeps time. The actor applies the argument swap, so a
//! boundary hit while the worker is down is simply skipped and the timer
//! keeps running.

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Signal;

/// Phase boundary reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationPhase {
    /// Switch to the alternate argument set.
    Enter,
    /// Switch back to the user's arguments.
    Exit,
}

/// State of the current window. At most one window is active.
#[derive(Debug, Default, Clone)]
pub struct DonationWindow {
    active: bool,
    started_at: Option<SystemTime>,
}

impl DonationWindow {
    pub fn open(&mut self) {
        self.active = true;
        self.started_at = Some(SystemTime::now());
    }

    pub fn close(&mut self) {
        self.active = false;
        self.started_at = None;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }
}

/// Spawns the phase timer. Runs until `token` is cancelled or the actor is gone.
pub(crate) fn spawn_scheduler(
    normal: Duration,
    alternate: Duration,
    token: CancellationToken,
    signals: mpsc::Sender<Signal>,
) {
    tokio::spawn(async move {
        let phases = [
            (normal, DonationPhase::Enter),
            (alternate, DonationPhase::Exit),
        ];
        for (wait, phase) in phases.into_iter().cycle() {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = time::sleep(wait) => {}
            }
            debug!(?phase, "donation phase boundary");
            if signals.send(Signal::Donation(phase)).await.is_err() {
                break;
            }
        }
    });
}
