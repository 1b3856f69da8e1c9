//! Restart policy.
//!
//! ## Contents
//! - [`RestartPolicy`] whether a restart request starts the worker again
//!
//! ## Quick wiring
//! ```text
//! Config { restart: RestartPolicy, restart_cooldown: Duration, .. }
//!      └─► core::actor::WorkerActor uses:
//!           - restart to decide stop+start vs stop-only
//!           - restart_cooldown as the fixed delay between the two
//! ```
//!
//! The cooldown is fixed: repeated failures reuse the same delay.

mod restart;

pub use restart::RestartPolicy;
