//! Extraction of hashrate samples, share tags and markers from worker text.
//!
//! The worker's output format is not specified anywhere; everything here is a
//! best-effort scan. A miss is never an error, it simply yields nothing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// `<1-5 digits>.<1-2 digits> Mh/s`
static HASHRATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{1,5}\.[0-9]{1,2} Mh/s").expect("hashrate pattern is valid")
});

/// Marker preceding the share tag, e.g. `... Mh/s  [A1234]`.
const SHARE_TAG_MARKER: &str = " [A";

/// Lines that pass the share-only display filter.
const SHARE_MARKERS: [&str; 2] = ["**Accepted", "**Rejected"];

/// One hashrate reading.
#[derive(Clone, Debug, PartialEq)]
pub struct HashSample {
    /// Rate in Mh/s.
    pub rate_mhs: f64,
    /// Token as printed by the worker, e.g. `"12.34 Mh/s"`.
    pub text: String,
    /// Last share tag seen, e.g. `"[A1234]"`.
    pub share_tag: Option<String>,
}

impl HashSample {
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.rate_mhs == 0.0
    }
}

impl fmt::Display for HashSample {
    /// `"12.34 Mh/s [A1234]"`, or just the token when no tag is known.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.share_tag {
            Some(tag) => write!(f, "{} {}", self.text, tag),
            None => f.write_str(&self.text),
        }
    }
}

/// First hashrate token in `text`, as (token, rate).
pub fn find_hashrate(text: &str) -> Option<(&str, f64)> {
    let token = HASHRATE.find(text)?.as_str();
    let number = token.strip_suffix(" Mh/s")?;
    let rate = number.parse::<f64>().ok()?;
    Some((token, rate))
}

/// Share tag (`[A...]`) following the ` [A` marker, brackets included.
pub fn find_share_tag(text: &str) -> Option<&str> {
    let marker = text.find(SHARE_TAG_MARKER)?;
    let open = marker + 1;
    let close = text[open..].find(']')? + open;
    Some(&text[open..=close])
}

/// Case-insensitive "error" marker.
pub fn has_error_marker(text: &str) -> bool {
    text.to_ascii_lowercase().contains("error")
}

/// `true` for accepted/rejected share lines.
pub fn is_share_line(line: &str) -> bool {
    SHARE_MARKERS.iter().any(|m| line.contains(m))
}
