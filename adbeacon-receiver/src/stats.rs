//! Inter-arrival statistics
//!
//! Gaps longer than the outlier cutoff (scanner paused, node out of range)
//! would swamp the percentiles, so they are counted but left out of the
//! distribution.

use serde::{Deserialize, Serialize};

/// Default cutoff above which a gap is treated as an outage, not an interval
pub const DEFAULT_OUTLIER_MS: u64 = 5_000;

/// Distribution of inter-arrival times
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalSummary {
    /// Intervals in the distribution
    pub count: usize,
    /// Arithmetic mean
    pub mean_ms: f64,
    /// 50th percentile
    pub median_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
    /// Shortest interval
    pub min_ms: u64,
    /// Longest interval under the cutoff
    pub max_ms: u64,
}

/// Collector for inter-arrival times
#[derive(Debug, Clone)]
pub struct IntervalStats {
    intervals: Vec<u64>,
    outlier_ms: u64,
    outliers: u64,
}

impl Default for IntervalStats {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLIER_MS)
    }
}

impl IntervalStats {
    /// Create a collector with the given outlier cutoff
    pub fn new(outlier_ms: u64) -> Self {
        Self {
            intervals: Vec::new(),
            outlier_ms,
            outliers: 0,
        }
    }

    /// Record one interval
    pub fn record(&mut self, interval_ms: u64) {
        if interval_ms > self.outlier_ms {
            self.outliers += 1;
        } else {
            self.intervals.push(interval_ms);
        }
    }

    /// Intervals kept in the distribution
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True when nothing has been recorded under the cutoff
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Gaps longer than the cutoff
    pub fn outliers(&self) -> u64 {
        self.outliers
    }

    /// Summarize the distribution, `None` when empty
    pub fn summary(&self) -> Option<IntervalSummary> {
        let mut sorted = self.intervals.clone();
        sorted.sort_unstable();
        let (&min_ms, &max_ms) = (sorted.first()?, sorted.last()?);

        let total: u64 = sorted.iter().sum();
        Some(IntervalSummary {
            count: sorted.len(),
            mean_ms: total as f64 / sorted.len() as f64,
            median_ms: percentile(&sorted, 0.5),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            min_ms,
            max_ms,
        })
    }
}

/// Linear-interpolated quantile of a sorted, non-empty slice
fn percentile(sorted: &[u64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * weight
}
