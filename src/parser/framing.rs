//! Reassembly of streamed output into complete units.
//!
//! - [`RecordBuffer`] (stderr): accumulates bytes until a CRLF appears; everything
//!   up to and including the **last** CRLF is released as one logical record,
//!   the unterminated tail stays buffered.
//! - [`LineBuffer`] (stdout): releases LF-terminated lines one by one.
//!
//! Both decode lossily and only once a unit is complete, so a multi-byte
//! character split across chunks is never mangled.

use tracing::debug;

/// Upper bound for an unterminated fragment. A worker that never terminates
/// its output would otherwise grow the buffer forever.
pub const MAX_PENDING: usize = 64 * 1024;

/// CRLF-delimited record accumulator for the telemetry stream.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: Vec<u8>,
}

impl RecordBuffer {
    /// Appends a chunk and returns the completed record, if any.
    pub fn push(&mut self, chunk: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(chunk);

        let Some(pos) = self.pending.windows(2).rposition(|w| w == b"\r\n") else {
            self.enforce_limit();
            return None;
        };
        let record: Vec<u8> = self.pending.drain(..pos + 2).collect();
        self.enforce_limit();
        Some(String::from_utf8_lossy(&record).into_owned())
    }

    /// Bytes received but not yet terminated.
    #[inline]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn enforce_limit(&mut self) {
        if self.pending.len() > MAX_PENDING {
            debug!(bytes = self.pending.len(), "dropping unterminated stderr fragment");
            self.pending.clear();
        }
    }
}

/// LF-delimited line splitter for the plain log stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends a chunk and returns every completed, trimmed, non-empty line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_owned());
            }
        }
        if self.pending.len() > MAX_PENDING {
            debug!(bytes = self.pending.len(), "dropping unterminated stdout fragment");
            self.pending.clear();
        }
        lines
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
