//! # Event bus.
//!
//! Every observable thing the supervisor does (a start, a hashrate sample, a
//! restart decision, a worker line) is published once on the [`Bus`] and
//! fanned out by tokio's broadcast channel:
//!
//! ```text
//!   WorkerActor ───┐                 ┌──► subscriber_listener ──► SubscriberSet
//!                  ├── publish ─► Bus┤
//!   SubscriberSet ─┘  (overflow,     └──► Supervisor::subscribe() (UI, tests)
//!                      panics)
//! ```
//!
//! Publishing never waits. Receivers that fall behind by more than the ring
//! capacity get `RecvError::Lagged(n)` and resume from the oldest event still
//! held; events published while nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing handle shared by the actor and subscriber workers.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Ring of `capacity` events (at least 1) shared by all receivers.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel::<Event>(capacity.max(1));
        Self { sender }
    }

    /// Publishes `ev` and returns how many receivers will see it (0 if none).
    pub fn publish(&self, ev: Event) -> usize {
        self.sender.send(ev).unwrap_or(0)
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::WorkerStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::WorkerStarted));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::WorkerStarted);
    }

    #[test]
    fn publish_reports_receiver_count() {
        let bus = Bus::new(4);
        assert_eq!(bus.publish(Event::new(EventKind::WorkerStarting)), 0);

        let _a = bus.subscribe();
        let _b = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);
        assert_eq!(bus.publish(Event::new(EventKind::WorkerStarting)), 2);
    }
}
