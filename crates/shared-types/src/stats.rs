//! Performance statistics snapshot types.

use serde::{Deserialize, Serialize};

/// Percentile summary of one operation's latency distribution.
///
/// Values are nanoseconds. Percentiles are derived from bucketed counts at
/// snapshot time; nothing is stored per-sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Samples recorded.
    pub count: u64,
    /// Smallest recorded sample, in nanoseconds.
    pub min_ns: u64,
    /// Largest recorded sample, in nanoseconds.
    pub max_ns: u64,
    /// Mean, in nanoseconds.
    pub mean_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
}

/// Point-in-time snapshot of every hub counter plus derived rates.
///
/// All counters are monotonically increasing over the process lifetime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Process uptime in seconds at snapshot time.
    pub uptime_seconds: f64,

    // Lookup path
    pub lookup_count: u64,
    pub bloom_filter_rejects: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub matcher_hits: u64,
    pub matcher_misses: u64,

    // Registration path
    pub registration_count: u64,
    pub registration_failures: u64,
    pub cache_evictions: u64,
    pub cache_expired: u64,

    // Coordination path
    pub coordination_count: u64,
    pub relay_delivered: u64,
    pub relay_failed: u64,

    // Gauges
    pub active_flows: u64,
    pub active_connections: u64,
    pub bloom_generations: u64,
    pub cache_entries: u64,

    // Derived rates (counts over uptime)
    pub lookups_per_second: f64,
    pub registrations_per_second: f64,
    pub coordination_per_second: f64,

    // Latency summaries
    pub lookup_latency: LatencySummary,
    pub registration_latency: LatencySummary,
    pub coordination_latency: LatencySummary,
}
