//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the non-blocking
//! [`SubscriberSet`] fan-out, and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! WorkerActor ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                      │
//!                                                        ┌─────────────┼──────────┐
//!                                                        ▼             ▼          ▼
//!                                                    LogWriter     log view    tray icon
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use rigvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ErrorCounter(std::sync::atomic::AtomicU32);
//!
//! #[async_trait]
//! impl Subscribe for ErrorCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ErrorDetected {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
