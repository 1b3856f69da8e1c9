//! # Watchdogs for one worker lifetime.
//!
//! Three independent monitors, each able to raise a restart request:
//!
//! - **zero-output grace**: one-shot timer; until it fires, hashrate samples
//!   are delivered but not evaluated (warmup).
//! - **zero hashrate**: [`ZeroHashrateCounter`], consecutive zero samples.
//! - **stall**: [`StallDetector`] sampled by a fixed-period ticker; a tick that
//!   sees no new sample means the worker stopped producing output.
//!
//! [`WatchdogSet`] holds their state. It is re-armed on every start and only
//! advanced by its own timers or by new samples, all on the actor task.

mod stall;
mod timers;
mod zero_hashrate;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::Signal;

pub use stall::StallDetector;
pub use zero_hashrate::ZeroHashrateCounter;

/// Watchdog state of the current worker lifetime.
#[derive(Debug)]
pub struct WatchdogSet {
    zero: ZeroHashrateCounter,
    stall: StallDetector,
    grace_elapsed: bool,
}

impl WatchdogSet {
    pub fn new(max_zero_samples: u32) -> Self {
        Self {
            zero: ZeroHashrateCounter::new(max_zero_samples),
            stall: StallDetector::default(),
            grace_elapsed: false,
        }
    }

    /// Resets every counter and starts the timers for `generation`.
    ///
    /// `grace = None` makes samples eligible at once; `stall = None` disables
    /// the stall ticker. Timers die with `token`.
    pub(crate) fn arm(
        &mut self,
        generation: u64,
        grace: Option<Duration>,
        stall: Option<Duration>,
        token: &CancellationToken,
        signals: &mpsc::Sender<Signal>,
    ) {
        self.reset();
        match grace {
            Some(d) => timers::spawn_grace(generation, d, token.clone(), signals.clone()),
            None => self.grace_elapsed = true,
        }
        if let Some(period) = stall {
            timers::spawn_stall_ticker(generation, period, token.clone(), signals.clone());
        }
    }

    /// Clears counters; the next samples are not eligible until re-armed.
    pub fn reset(&mut self) {
        self.reset_counters();
        self.grace_elapsed = false;
    }

    /// Clears the zero and stall counters, keeping the grace state.
    pub fn reset_counters(&mut self) {
        self.zero.reset();
        self.stall.reset();
    }

    pub fn set_max_zero_samples(&mut self, n: u32) {
        self.zero.set_threshold(n);
    }

    pub fn on_grace_elapsed(&mut self) {
        self.grace_elapsed = true;
    }

    #[inline]
    pub fn grace_elapsed(&self) -> bool {
        self.grace_elapsed
    }

    /// Records one delivered sample; returns `true` when the zero-hashrate
    /// counter trips.
    pub fn on_sample(&mut self, rate_mhs: f64) -> bool {
        self.stall.record();
        self.grace_elapsed && self.zero.observe(rate_mhs)
    }

    /// Stall tick; returns `true` when no sample arrived since the last one.
    pub fn on_stall_tick(&mut self) -> bool {
        self.stall.tick()
    }

    #[inline]
    pub fn zero_count(&self) -> u32 {
        self.zero.count()
    }
}
