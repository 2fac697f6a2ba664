//! Byte counter for one relay.

use crate::types::ProgressSnapshot;

/// Running total of received bytes against a declared size
///
/// Never resets; each [`update`](Self::update) adds exactly the chunk length.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    received: u64,
    total: u64,
}

impl ProgressTracker {
    /// Start tracking against `total` bytes (0 = unknown)
    pub fn new(total: u64) -> Self {
        Self { received: 0, total }
    }

    /// Account for a chunk and return the resulting snapshot
    pub fn update(&mut self, chunk_len: usize) -> ProgressSnapshot {
        self.received = self.received.saturating_add(chunk_len as u64);
        self.snapshot()
    }

    /// Current snapshot without changing the count
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            loaded: self.received,
            total: self.total,
        }
    }

    /// Bytes received so far
    pub fn received(&self) -> u64 {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_accumulates_chunk_lengths() {
        let mut tracker = ProgressTracker::new(10);
        assert_eq!(
            tracker.update(4),
            ProgressSnapshot {
                loaded: 4,
                total: 10
            }
        );
        assert_eq!(tracker.update(6).loaded, 10);
        assert_eq!(tracker.received(), 10);
    }

    #[test]
    fn unknown_total_stays_zero() {
        let mut tracker = ProgressTracker::new(0);
        let snapshot = tracker.update(1024);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.percent(), None);
    }

    #[test]
    fn sum_of_deltas_equals_total_received() {
        let chunks = [3usize, 0, 17, 1, 250];
        let mut tracker = ProgressTracker::default();
        let mut previous = 0;
        let mut delta_sum = 0;
        for len in chunks {
            let snapshot = tracker.update(len);
            assert!(snapshot.loaded >= previous);
            delta_sum += snapshot.loaded - previous;
            previous = snapshot.loaded;
        }
        assert_eq!(delta_sum, chunks.iter().sum::<usize>() as u64);
    }
}
