//! Sample History and Leak Heuristic
//!
//! Fixed-capacity ring buffer of [`MemorySample`]s. The leak heuristic compares
//! the mean `heap_used` of the most recent `window` samples against the `window`
//! samples before them and flags sustained growth above a threshold. It is a
//! trend check, not a proof: a legitimately growing workload trips it too.

use std::collections::VecDeque;

use serde::Serialize;

use super::sample::MemorySample;

/// Outcome of comparing two consecutive sample windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendAnalysis {
    /// Mean heap used over the older window, in bytes
    pub older_mean: f64,
    /// Mean heap used over the recent window, in bytes
    pub recent_mean: f64,
    /// `recent_mean / older_mean` (infinite when the older mean is zero)
    pub growth_ratio: f64,
    /// Whether growth exceeded the threshold
    pub leak_suspected: bool,
}

/// Ring buffer of memory samples
#[derive(Debug, Clone)]
pub struct SampleHistory {
    capacity: usize,
    samples: VecDeque<MemorySample>,
}

impl SampleHistory {
    /// Create an empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, dropping the oldest when full
    pub fn push(&mut self, sample: MemorySample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no samples are held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&MemorySample> {
        self.samples.back()
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MemorySample> {
        self.samples.iter()
    }

    /// Compare the last `window` samples with the `window` before them.
    ///
    /// Returns `None` until `2 * window` samples exist.
    pub fn analyze_trend(&self, window: usize, growth_threshold: f64) -> Option<TrendAnalysis> {
        if window == 0 || self.samples.len() < window * 2 {
            return None;
        }

        let start = self.samples.len() - window * 2;
        let older_mean = mean_heap_used(self.samples.range(start..start + window));
        let recent_mean = mean_heap_used(self.samples.range(start + window..));

        let growth_ratio = if older_mean == 0.0 {
            if recent_mean == 0.0 {
                1.0
            } else {
                f64::INFINITY
            }
        } else {
            recent_mean / older_mean
        };

        Some(TrendAnalysis {
            older_mean,
            recent_mean,
            growth_ratio,
            leak_suspected: recent_mean > older_mean * (1.0 + growth_threshold),
        })
    }

    /// Whether [`analyze_trend`](Self::analyze_trend) suspects a leak
    pub fn detect_leak(&self, window: usize, growth_threshold: f64) -> bool {
        self.analyze_trend(window, growth_threshold)
            .is_some_and(|trend| trend.leak_suspected)
    }
}

fn mean_heap_used<'a>(samples: impl ExactSizeIterator<Item = &'a MemorySample>) -> f64 {
    let count = samples.len();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = samples.map(|sample| sample.heap_used as f64).sum();
    total / count as f64
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(heap_used: u64) -> MemorySample {
        MemorySample::new(heap_used, 1 << 30, 0, heap_used)
    }

    fn history_of(values: impl IntoIterator<Item = u64>) -> SampleHistory {
        let mut history = SampleHistory::new(100);
        for value in values {
            history.push(sample(value));
        }
        history
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut history = SampleHistory::new(3);
        for value in 1..=5 {
            history.push(sample(value));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.capacity(), 3);
        let values: Vec<u64> = history.iter().map(|s| s.heap_used).collect();
        assert_eq!(values, vec![3, 4, 5]);
        assert_eq!(history.latest().unwrap().heap_used, 5);
    }

    #[test]
    fn test_insufficient_samples_never_flag() {
        // 39 samples with huge growth
        let history = history_of((0..39).map(|i| 1_000 * (i + 1) * (i + 1)));
        assert!(history.analyze_trend(20, 0.20).is_none());
        assert!(!history.detect_leak(20, 0.20));
    }

    #[test]
    fn test_thirty_percent_growth_flags_leak() {
        let history = history_of(
            std::iter::repeat(100_000_000)
                .take(20)
                .chain(std::iter::repeat(130_000_000).take(20)),
        );
        let trend = history.analyze_trend(20, 0.20).unwrap();
        assert!(trend.leak_suspected);
        assert!((trend.growth_ratio - 1.3).abs() < 1e-9);
        assert!(history.detect_leak(20, 0.20));
    }

    #[test]
    fn test_flat_and_declining_do_not_flag() {
        let flat = history_of(std::iter::repeat(100_000_000).take(40));
        assert!(!flat.detect_leak(20, 0.20));

        let declining = history_of((0..40).map(|i| 200_000_000 - i * 1_000_000));
        assert!(!declining.detect_leak(20, 0.20));
    }

    #[test]
    fn test_growth_at_threshold_does_not_flag() {
        let history = history_of(
            std::iter::repeat(100)
                .take(20)
                .chain(std::iter::repeat(120).take(20)),
        );
        assert!(!history.detect_leak(20, 0.20));
    }

    #[test]
    fn test_only_latest_windows_considered() {
        // Early growth followed by a long flat tail
        let values = (0..20)
            .map(|_| 10)
            .chain((0..20).map(|_| 100))
            .chain((0..40).map(|_| 100));
        let history = history_of(values);
        assert!(!history.detect_leak(20, 0.20));
    }

    #[test]
    fn test_custom_window() {
        let history = history_of([100, 100, 200, 200]);
        assert!(history.detect_leak(2, 0.5));
        assert!(!history.detect_leak(2, 1.0));
        assert!(!history.detect_leak(0, 0.5));
    }

    #[test]
    fn test_zero_older_mean() {
        let history = history_of([0, 0, 5, 5]);
        let trend = history.analyze_trend(2, 0.2).unwrap();
        assert!(trend.growth_ratio.is_infinite());
        assert!(trend.leak_suspected);
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(capacity in 1usize..64, pushes in 0usize..200) {
            let mut history = SampleHistory::new(capacity);
            for i in 0..pushes {
                history.push(sample(i as u64));
            }
            prop_assert_eq!(history.len(), pushes.min(capacity));
            if pushes > 0 {
                prop_assert_eq!(history.latest().unwrap().heap_used, pushes as u64 - 1);
            }
        }

        #[test]
        fn prop_non_increasing_series_never_flags(
            start in 1_000u64..1_000_000_000,
            steps in proptest::collection::vec(0u64..1_000, 40),
        ) {
            let mut value = start;
            let mut history = SampleHistory::new(100);
            for step in steps {
                history.push(sample(value));
                value = value.saturating_sub(step);
            }
            prop_assert!(!history.detect_leak(20, 0.20));
        }
    }
}
