//! # Subscriber fan-out.
//!
//! [`SubscriberSet`] hands every bus event to each registered [`Subscribe`]
//! implementation through its own bounded queue and worker task:
//!
//! ```text
//! subscriber_listener ── emit(&Event) ──┬─► queue(LogWriter) ─► worker ─► on_event
//!                                       ├─► queue(log view)  ─► worker ─► on_event
//!                                       └─► queue(tray)      ─► worker ─► on_event
//! ```
//!
//! - `emit` uses `try_send` and never waits; a full or closed queue loses the
//!   event for that subscriber only and publishes `SubscriberOverflow`
//! - each subscriber sees its events in bus order
//! - a panic inside `on_event` is caught, reported as `SubscriberPanicked`,
//!   and the worker carries on with the next event
//!
//! The actor never waits on a subscriber, so a slow UI can lose log lines but
//! can never delay a stop or a restart.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending side of one subscriber's queue.
struct Queue {
    subscriber: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues plus the tasks draining them.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    tasks: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one draining task per subscriber. Queue capacity comes from
    /// [`Subscribe::queue_capacity`] (at least 1).
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (queues, tasks) = subs
            .into_iter()
            .map(|sub| spawn_queue(sub, bus.clone()))
            .unzip();
        Self { queues, tasks, bus }
    }

    /// Offers `event` to every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        // Overflow reports are not re-reported, or a stuck queue would feed itself.
        let report = event.kind != EventKind::SubscriberOverflow;

        for queue in &self.queues {
            let why = match queue.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if report {
                warn!(subscriber = queue.subscriber, why, "event dropped for subscriber");
                self.bus
                    .publish(Event::subscriber_overflow(queue.subscriber, why));
            }
        }
    }

    /// Closes every queue and waits until the workers drained what is left.
    pub async fn shutdown(self) {
        let Self { queues, tasks, .. } = self;
        drop(queues);
        for task in tasks {
            let _ = task.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

fn spawn_queue(sub: Arc<dyn Subscribe>, bus: Bus) -> (Queue, JoinHandle<()>) {
    let subscriber = sub.name();
    let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let delivery = std::panic::AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
            if let Err(payload) = delivery.await {
                let info = panic_message(payload.as_ref());
                warn!(subscriber, %info, "subscriber panicked");
                bus.publish(Event::subscriber_panicked(subscriber, info));
            }
        }
    });
    (Queue { subscriber, tx }, task)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
