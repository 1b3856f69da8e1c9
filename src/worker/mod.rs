//! The supervised worker: what to launch, its lifecycle states, and the
//! handle owning the live process.
//!
//! - [`WorkerSpec`] executable + arguments, immutable per run
//! - [`WorkerState`] Stopped / Starting / Running / Stopping
//! - `WorkerHandle` (crate-private) owns the `tokio::process::Child`

mod process;
mod spec;
mod state;

pub(crate) use process::{WorkerHandle, describe_exit};
pub use spec::{ArgSnapshot, WorkerSpec, split_args};
pub use state::WorkerState;
