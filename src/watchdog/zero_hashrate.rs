//! Consecutive zero-sample counter.

/// Counts consecutive `0.00 Mh/s` samples.
///
/// Trips when the count **exceeds** `threshold`; tripping resets the count so
/// a worker that keeps reporting zero trips again only after another full run.
#[derive(Debug, Clone)]
pub struct ZeroHashrateCounter {
    count: u32,
    threshold: u32,
}

impl ZeroHashrateCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: 0,
            threshold,
        }
    }

    /// Feeds one sample; returns `true` when the counter trips.
    pub fn observe(&mut self, rate_mhs: f64) -> bool {
        if rate_mhs != 0.0 {
            self.count = 0;
            return false;
        }
        self.count = self.count.saturating_add(1);
        if self.count > self.threshold {
            self.count = 0;
            return true;
        }
        false
    }

    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold;
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
