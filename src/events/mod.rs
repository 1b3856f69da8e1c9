//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the worker actor, its watchdogs and
//! the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`OutputStream`] source stream of a worker log line
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `WorkerActor` (lifecycle, telemetry, restart and donation
//!   events), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Supervisor` listener (fans out to `SubscriberSet`) and any
//!   receiver obtained through `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, OutputStream};
