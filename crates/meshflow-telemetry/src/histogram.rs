//! Bucketed latency histogram with on-demand percentiles.
//!
//! Buckets double in width (1µs, 2µs, 4µs, ...), the same exponential
//! layout used for operation timing elsewhere in the stack. Recording is a
//! single relaxed `fetch_add`; percentile queries walk the bucket counts
//! and interpolate inside the target bucket.

use shared_types::LatencySummary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Number of power-of-two buckets. Bucket `i` covers `[2^i, 2^(i+1))` ns;
/// the last bucket absorbs everything above ~134s.
const BUCKET_COUNT: usize = 38;

/// Thread-safe latency histogram.
#[derive(Debug)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; BUCKET_COUNT],
    count: AtomicU64,
    sum_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyHistogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }

    fn bucket_index(ns: u64) -> usize {
        let ns = ns.max(1);
        ((63 - ns.leading_zeros()) as usize).min(BUCKET_COUNT - 1)
    }

    /// Lower bound of a bucket, in nanoseconds.
    fn bucket_low(index: usize) -> u64 {
        1u64 << index
    }

    /// Record one sample.
    pub fn record(&self, elapsed: Duration) {
        let ns = (elapsed.as_nanos() as u64).max(1);
        let idx = Self::bucket_index(ns);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ns.fetch_add(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    /// Number of samples recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Estimate the latency at percentile `p` (0.0..=1.0), in nanoseconds.
    ///
    /// Returns 0 for an empty histogram. The estimate interpolates linearly
    /// inside the bucket containing the target rank and is clamped to the
    /// observed min/max, so summaries never report values outside what was
    /// actually seen.
    pub fn percentile(&self, p: f64) -> u64 {
        let total = self.count();
        if total == 0 {
            return 0;
        }
        let p = p.clamp(0.0, 1.0);
        let target = ((p * total as f64).ceil() as u64).clamp(1, total);

        let mut seen = 0u64;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            let in_bucket = bucket.load(Ordering::Relaxed);
            if in_bucket == 0 {
                continue;
            }
            if seen + in_bucket >= target {
                let low = Self::bucket_low(idx);
                let rank_in_bucket = (target - seen) as f64 / in_bucket as f64;
                let estimate = low as f64 + rank_in_bucket * low as f64;
                return (estimate as u64)
                    .clamp(self.min_ns.load(Ordering::Relaxed), self.max_ns.load(Ordering::Relaxed));
            }
            seen += in_bucket;
        }
        self.max_ns.load(Ordering::Relaxed)
    }

    /// Produce a percentile summary of everything recorded so far.
    pub fn summary(&self) -> LatencySummary {
        let count = self.count();
        if count == 0 {
            return LatencySummary::default();
        }
        LatencySummary {
            count,
            min_ns: self.min_ns.load(Ordering::Relaxed),
            max_ns: self.max_ns.load(Ordering::Relaxed),
            mean_ns: self.sum_ns.load(Ordering::Relaxed) / count,
            p50_ns: self.percentile(0.50),
            p90_ns: self.percentile(0.90),
            p95_ns: self.percentile(0.95),
            p99_ns: self.percentile(0.99),
        }
    }
}
