//! # Worker output parser.
//!
//! Turns raw stdout/stderr chunks into display lines and telemetry.
//!
//! - **stdout** is a plain log: LF-split lines, optionally restricted to
//!   accepted/rejected share lines when the share-only filter is on.
//! - **stderr** is the telemetry channel: CRLF-delimited logical records, each
//!   scanned for a share tag, a hashrate token and an error marker.
//!
//! The parser keeps no opinion about restarts; it only reports what a record
//! contained. The actor decides what to do with it.
//!
//! ```
//! use rigvisor::parser::OutputParser;
//!
//! let mut parser = OutputParser::new(false);
//! assert!(parser.feed_stderr(b"12.34 Mh/s ").is_none());
//! let record = parser.feed_stderr(b" [A1234]\r\n").unwrap();
//!
//! assert_eq!(record.sample.unwrap().to_string(), "12.34 Mh/s [A1234]");
//! assert!(record.error.is_none());
//! ```

mod framing;
mod telemetry;

pub use framing::{LineBuffer, MAX_PENDING, RecordBuffer};
pub use telemetry::{HashSample, find_hashrate, find_share_tag, has_error_marker, is_share_line};

/// What one logical stderr record contained.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// First hashrate sample in the record.
    pub sample: Option<HashSample>,
    /// Display lines that passed the share-only filter.
    pub lines: Vec<String>,
    /// First line carrying the error marker.
    pub error: Option<String>,
}

/// Per-worker-lifetime output parser.
#[derive(Debug, Default)]
pub struct OutputParser {
    stderr: RecordBuffer,
    stdout: LineBuffer,
    share_tag: Option<String>,
    share_only: bool,
}

impl OutputParser {
    #[must_use]
    pub fn new(share_only: bool) -> Self {
        Self {
            share_only,
            ..Self::default()
        }
    }

    pub fn set_share_only(&mut self, share_only: bool) {
        self.share_only = share_only;
    }

    /// Last share tag seen, e.g. `"[A1234]"`.
    pub fn share_tag(&self) -> Option<&str> {
        self.share_tag.as_deref()
    }

    /// Forgets buffered fragments and the share tag (new worker lifetime).
    pub fn reset(&mut self) {
        self.stderr.clear();
        self.stdout.clear();
        self.share_tag = None;
    }

    /// Feeds a stdout chunk; returns lines to display.
    pub fn feed_stdout(&mut self, chunk: &[u8]) -> Vec<String> {
        let share_only = self.share_only;
        let mut lines = self.stdout.push(chunk);
        lines.retain(|l| !share_only || is_share_line(l));
        lines
    }

    /// Feeds a stderr chunk; returns the completed record, if any.
    ///
    /// The share tag is extracted before the hashrate so that a record carrying
    /// both reports the tag alongside its own sample.
    pub fn feed_stderr(&mut self, chunk: &[u8]) -> Option<Record> {
        let text = self.stderr.push(chunk)?;

        if let Some(tag) = find_share_tag(&text) {
            self.share_tag = Some(tag.to_owned());
        }

        let sample = find_hashrate(&text).map(|(token, rate)| HashSample {
            rate_mhs: rate,
            text: token.to_owned(),
            share_tag: self.share_tag.clone(),
        });

        let mut lines = Vec::new();
        let mut error = None;
        for fragment in text.split('\n') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            if error.is_none() && has_error_marker(fragment) {
                error = Some(fragment.to_owned());
            }
            if !self.share_only || is_share_line(fragment) {
                lines.push(fragment.to_owned());
            }
        }

        Some(Record {
            sample,
            lines,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashrate_record_carries_share_tag() {
        let mut p = OutputParser::new(false);
        let rec = p.feed_stderr(b"12.34 Mh/s  [A1234]\r\n").unwrap();

        let sample = rec.sample.unwrap();
        assert_eq!(sample.to_string(), "12.34 Mh/s [A1234]");
        assert!((sample.rate_mhs - 12.34).abs() < f64::EPSILON);
        assert_eq!(rec.error, None);
        assert_eq!(rec.lines, vec!["12.34 Mh/s  [A1234]".to_string()]);
    }

    #[test]
    fn share_tag_is_remembered_for_later_samples() {
        let mut p = OutputParser::new(false);
        p.feed_stderr(b"share [A7]\r\n").unwrap();
        let rec = p.feed_stderr(b"3.50 Mh/s\r\n").unwrap();
        assert_eq!(rec.sample.unwrap().to_string(), "3.50 Mh/s [A7]");
        assert_eq!(p.share_tag(), Some("[A7]"));
    }

    #[test]
    fn error_record_is_flagged_even_with_hashrate() {
        let mut p = OutputParser::new(false);
        let rec = p
            .feed_stderr(b"0.00 Mh/s\r\nError: connection refused\r\n")
            .unwrap();
        assert!(rec.sample.unwrap().is_zero());
        assert_eq!(rec.error.as_deref(), Some("Error: connection refused"));
    }

    #[test]
    fn split_delivery_matches_single_chunk() {
        let input: &[u8] = b"GPU0 12.34 Mh/s  [A1234]\r\nnote\r\nError: boom\r\n";

        let mut whole = OutputParser::new(false);
        let expected = whole.feed_stderr(input).unwrap();

        for cut in 1..input.len() {
            let mut p = OutputParser::new(false);
            let first = p.feed_stderr(&input[..cut]);
            let second = p.feed_stderr(&input[cut..]);
            let merged = match (first, second) {
                (None, Some(r)) => r,
                (Some(a), Some(b)) => Record {
                    sample: a.sample.or(b.sample),
                    lines: a.lines.into_iter().chain(b.lines).collect(),
                    error: a.error.or(b.error),
                },
                (Some(a), None) => a,
                (None, None) => panic!("no record for cut {cut}"),
            };
            assert_eq!(merged, expected, "cut at {cut}");
        }
    }

    #[test]
    fn share_only_filters_both_streams() {
        let mut p = OutputParser::new(true);
        let out = p.feed_stdout(b"connecting\n**Accepted share\n**Rejected share\n");
        assert_eq!(out, vec!["**Accepted share", "**Rejected share"]);

        let rec = p.feed_stderr(b"1.00 Mh/s\r\n**Accepted\r\n").unwrap();
        assert_eq!(rec.lines, vec!["**Accepted".to_string()]);
        assert!(rec.sample.is_some());
    }

    #[test]
    fn reset_drops_fragment_and_tag() {
        let mut p = OutputParser::new(false);
        p.feed_stderr(b"x [A1]\r\npartial");
        p.reset();
        assert_eq!(p.share_tag(), None);
        let rec = p.feed_stderr(b"2.00 Mh/s\r\n").unwrap();
        assert_eq!(rec.sample.unwrap().to_string(), "2.00 Mh/s");
    }
}
