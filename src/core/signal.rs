//! Internal messages from background tasks to the worker actor.
//!
//! Everything that is not a caller command arrives here: output chunks from
//! the reader tasks, watchdog timer ticks and donation phase boundaries.
//! Worker-bound signals carry the generation they were produced for; the
//! actor drops them when that generation is no longer current.

use crate::events::OutputStream;

use super::donation::DonationPhase;

#[derive(Debug)]
pub(crate) enum Signal {
    /// Raw bytes read from one of the worker's streams.
    Output {
        generation: u64,
        stream: OutputStream,
        chunk: Vec<u8>,
    },
    /// Zero-output grace ran out; zero samples count from now on.
    GraceElapsed { generation: u64 },
    /// Stall detector period boundary.
    StallTick { generation: u64 },
    /// Donation scheduler phase boundary.
    Donation(DonationPhase),
}
