//! The hub-wide metrics collector.
//!
//! Thread-safe counters and gauges observed passively by every operation
//! path. The collector never influences behavior; it only accounts for it.

use crate::histogram::LatencyHistogram;
use crate::probes::{CounterSnapshot, ExecEvent, NetTraceEvent, ProbeStats};
use crate::TelemetryError;
use parking_lot::Mutex;
use shared_types::PerformanceStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How a single lookup resolved, for accounting purposes.
///
/// Exactly one of these is recorded per lookup. Every outcome except a
/// cache hit counts as a cache miss, so
/// `cache_hits + cache_misses == lookup_count` holds by construction;
/// filter rejects are the subset of misses that never touched the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The filter proved the key absent; cache and matcher were not touched.
    BloomReject,
    /// Served from the cache.
    CacheHit,
    /// Cache missed; the authoritative matcher had the key.
    MatcherHit,
    /// Cache missed and the matcher did not have the key (false positive
    /// from the filter, or a removed key).
    MatcherMiss,
}

/// Passive counters and latency histograms for every hub path.
#[derive(Debug)]
pub struct MetricsCollector {
    started_at: Instant,

    // Lookup path
    lookup_count: AtomicU64,
    bloom_filter_rejects: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    matcher_hits: AtomicU64,
    matcher_misses: AtomicU64,

    // Registration path
    registration_count: AtomicU64,
    registration_failures: AtomicU64,
    cache_evictions: AtomicU64,
    cache_expired: AtomicU64,

    // Coordination path
    coordination_count: AtomicU64,
    relay_delivered: AtomicU64,
    relay_failed: AtomicU64,

    // Gauges, set by the owning structures
    active_flows: AtomicU64,
    active_connections: AtomicU64,
    bloom_generations: AtomicU64,
    cache_entries: AtomicU64,

    // Latency histograms
    lookup_latency: LatencyHistogram,
    registration_latency: LatencyHistogram,
    coordination_latency: LatencyHistogram,

    // Optional kernel-probe aggregates
    probes: Mutex<ProbeStats>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a collector; uptime is measured from this call.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            lookup_count: AtomicU64::new(0),
            bloom_filter_rejects: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            matcher_hits: AtomicU64::new(0),
            matcher_misses: AtomicU64::new(0),
            registration_count: AtomicU64::new(0),
            registration_failures: AtomicU64::new(0),
            cache_evictions: AtomicU64::new(0),
            cache_expired: AtomicU64::new(0),
            coordination_count: AtomicU64::new(0),
            relay_delivered: AtomicU64::new(0),
            relay_failed: AtomicU64::new(0),
            active_flows: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            bloom_generations: AtomicU64::new(0),
            cache_entries: AtomicU64::new(0),
            lookup_latency: LatencyHistogram::new(),
            registration_latency: LatencyHistogram::new(),
            coordination_latency: LatencyHistogram::new(),
            probes: Mutex::new(ProbeStats::default()),
        }
    }

    /// Record one lookup with its outcome and elapsed time.
    pub fn record_lookup(&self, elapsed: Duration, outcome: LookupOutcome) {
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        self.lookup_latency.record(elapsed);
        match outcome {
            LookupOutcome::BloomReject => {
                self.bloom_filter_rejects.fetch_add(1, Ordering::Relaxed);
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            LookupOutcome::CacheHit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            LookupOutcome::MatcherHit => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
                self.matcher_hits.fetch_add(1, Ordering::Relaxed);
            }
            LookupOutcome::MatcherMiss => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
                self.matcher_misses.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record one registration attempt.
    pub fn record_registration(&self, elapsed: Duration, succeeded: bool) {
        self.registration_latency.record(elapsed);
        if succeeded {
            self.registration_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.registration_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one coordination relay attempt.
    pub fn record_coordination(&self, elapsed: Duration, delivered: bool) {
        self.coordination_count.fetch_add(1, Ordering::Relaxed);
        self.coordination_latency.record(elapsed);
        if delivered {
            self.relay_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.relay_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a capacity-driven cache eviction.
    pub fn record_cache_eviction(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a TTL-expired cache entry purge.
    pub fn record_cache_expired(&self) {
        self.cache_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active_flows(&self, n: u64) {
        self.active_flows.store(n, Ordering::Relaxed);
    }

    pub fn set_active_connections(&self, n: u64) {
        self.active_connections.store(n, Ordering::Relaxed);
    }

    pub fn set_bloom_generations(&self, n: u64) {
        self.bloom_generations.store(n, Ordering::Relaxed);
    }

    pub fn set_cache_entries(&self, n: u64) {
        self.cache_entries.store(n, Ordering::Relaxed);
    }

    /// Merge a kernel execution-trace event.
    pub fn ingest_exec_event(&self, event: &ExecEvent) {
        self.probes.lock().ingest_exec(event);
    }

    /// Merge a kernel network-trace event.
    pub fn ingest_net_event(&self, event: &NetTraceEvent) {
        self.probes.lock().ingest_net(event);
    }

    /// Merge a counter-map snapshot from an external packet counter.
    pub fn ingest_counter_snapshot(&self, snapshot: &CounterSnapshot) {
        self.probes.lock().ingest_counters(snapshot);
    }

    /// Process uptime.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Produce a point-in-time snapshot with derived rates and percentiles.
    pub fn snapshot(&self) -> PerformanceStats {
        let uptime = self.uptime().as_secs_f64().max(f64::EPSILON);
        let lookup_count = self.lookup_count.load(Ordering::Relaxed);
        let registration_count = self.registration_count.load(Ordering::Relaxed);
        let coordination_count = self.coordination_count.load(Ordering::Relaxed);

        PerformanceStats {
            uptime_seconds: uptime,
            lookup_count,
            bloom_filter_rejects: self.bloom_filter_rejects.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            matcher_hits: self.matcher_hits.load(Ordering::Relaxed),
            matcher_misses: self.matcher_misses.load(Ordering::Relaxed),
            registration_count,
            registration_failures: self.registration_failures.load(Ordering::Relaxed),
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            cache_expired: self.cache_expired.load(Ordering::Relaxed),
            coordination_count,
            relay_delivered: self.relay_delivered.load(Ordering::Relaxed),
            relay_failed: self.relay_failed.load(Ordering::Relaxed),
            active_flows: self.active_flows.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            bloom_generations: self.bloom_generations.load(Ordering::Relaxed),
            cache_entries: self.cache_entries.load(Ordering::Relaxed),
            lookups_per_second: lookup_count as f64 / uptime,
            registrations_per_second: registration_count as f64 / uptime,
            coordination_per_second: coordination_count as f64 / uptime,
            lookup_latency: self.lookup_latency.summary(),
            registration_latency: self.registration_latency.summary(),
            coordination_latency: self.coordination_latency.summary(),
        }
    }

    /// Render the current snapshot (plus probe aggregates) as JSON into
    /// `buffer`, replacing its contents.
    pub fn export_json(&self, buffer: &mut String) -> Result<(), TelemetryError> {
        #[derive(serde::Serialize)]
        struct Export<'a> {
            stats: PerformanceStats,
            probes: &'a ProbeStats,
        }

        let probes = self.probes.lock();
        let rendered = serde_json::to_string_pretty(&Export {
            stats: self.snapshot(),
            probes: &*probes,
        })?;
        buffer.clear();
        buffer.push_str(&rendered);
        Ok(())
    }
}
