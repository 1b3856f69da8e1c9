//! # Subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers (log view,
//! tray notifications, metrics) into the supervisor. Each subscriber is driven
//! by a dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! A slow implementation only fills its own queue: the actor and the other
//! subscribers keep going. Once the queue (sized by
//! [`Subscribe::queue_capacity`]) is full, further events for that
//! subscriber are dropped and reported as `SubscriberOverflow`.
//!
//! ## Example
//! ```rust
//! use rigvisor::{Event, EventKind, Subscribe};
//!
//! struct HashrateLabel;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for HashrateLabel {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::HashrateUpdated {
//!             let _text = ev.hashrate.as_deref().unwrap_or("-");
//!         }
//!     }
//!     fn name(&self) -> &'static str { "hashrate-label" }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Receives every bus event, in publish order, on its own task.
///
/// Implementations should not block the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per event. A panic here is caught and reported.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// Worker log lines arrive in bursts; the default leaves room for them.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
