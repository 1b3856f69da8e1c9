use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::actor::WorkerActor;
use super::config::Config;
use super::donation;
use super::supervisor::Supervisor;

/// Caller commands waiting for the actor.
const COMMAND_QUEUE: usize = 32;
/// Output chunks and timer ticks waiting for the actor.
const SIGNAL_QUEUE: usize = 256;

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (lifecycle, log lines, hashrate,
    /// restarts) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Spawns the actor and its background tasks and returns the handle.
    ///
    /// Must be called inside a Tokio runtime. Initializes:
    /// - event bus and subscriber fan-out
    /// - worker actor
    /// - donation scheduler (when enabled)
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        if !subs.is_empty() {
            subscriber_listener(&bus, subs, token.clone());
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (sig_tx, sig_rx) = mpsc::channel(SIGNAL_QUEUE);

        let donation = &self.cfg.donation;
        if donation.enabled {
            donation::spawn_scheduler(
                donation.normal_phase,
                donation.alternate_phase,
                token.child_token(),
                sig_tx.clone(),
            );
        }

        let actor = WorkerActor::new(self.cfg, bus.clone(), token, cmd_rx, sig_rx, sig_tx);
        tokio::spawn(actor.run());

        Supervisor::new(cmd_tx, bus)
    }
}

/// Forwards bus events to the subscriber set until shutdown, then drains what
/// is left and waits for the subscriber workers.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    });
}
