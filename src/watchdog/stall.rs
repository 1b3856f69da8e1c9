//! No-output-activity detection.

/// Compares the number of delivered hashrate samples between two ticks.
#[derive(Debug, Default, Clone)]
pub struct StallDetector {
    delivered: u64,
    seen_at_last_tick: u64,
}

impl StallDetector {
    /// Counts one delivered sample.
    #[inline]
    pub fn record(&mut self) {
        self.delivered = self.delivered.wrapping_add(1);
    }

    /// Returns `true` when nothing was delivered since the previous tick.
    pub fn tick(&mut self) -> bool {
        let stalled = self.delivered == self.seen_at_last_tick;
        self.seen_at_last_tick = self.delivered;
        stalled
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_without_samples_is_a_stall() {
        let mut s = StallDetector::default();
        assert!(s.tick());
        s.record();
        assert!(!s.tick());
        assert!(s.tick());
    }

    #[test]
    fn reset_forgets_history() {
        let mut s = StallDetector::default();
        s.record();
        s.record();
        s.reset();
        assert_eq!(s.delivered(), 0);
        assert!(s.tick());
    }
}
