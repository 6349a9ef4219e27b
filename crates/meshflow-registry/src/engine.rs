//! The lookup engine: filter → cache → matcher, one registration path.
//!
//! Lookup fast path: a filter rejection answers "absent" without touching
//! the cache or the matcher. Otherwise the cache is consulted, and only a
//! cache miss reaches the authoritative matcher, whose hit repopulates the
//! cache. Registration writes the matcher first (it is the source of
//! truth), then the filter, then writes through the cache.

use crate::config::RegistryConfig;
use crate::domain::{
    strategy_for, DigestStrategy, ExactMatcher, FlowCache, FlowKey, GenerationalBloom,
};
use crate::error::RegistryError;
use meshflow_telemetry::metrics::LookupOutcome;
use meshflow_telemetry::MetricsCollector;
use parking_lot::RwLock;
use shared_types::{ComponentId, FlowRecord, FlowType, MAX_FLOW_PRIORITY};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Composed lookup/registration engine over matcher, filter, and cache.
pub struct LookupEngine {
    digest: &'static dyn DigestStrategy,
    matcher: ExactMatcher,
    bloom: RwLock<GenerationalBloom>,
    cache: FlowCache,
    metrics: Arc<MetricsCollector>,
}

impl LookupEngine {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    /// `InvalidConfig` when any bound in `config` is out of range.
    pub fn new(config: &RegistryConfig, metrics: Arc<MetricsCollector>) -> Result<Self, RegistryError> {
        config.validate()?;
        let engine = Self {
            digest: strategy_for(config.matcher.digest_algorithm),
            matcher: ExactMatcher::new(config.matcher.max_entries),
            bloom: RwLock::new(GenerationalBloom::new(
                config.bloom.expected_entries,
                config.bloom.target_fpr,
                config.bloom.hash_count,
                config.bloom.max_generations,
            )),
            cache: FlowCache::new(&config.cache, Arc::clone(&metrics)),
            metrics,
        };
        debug!(
            digest = engine.digest.name(),
            matcher_capacity = engine.matcher.capacity(),
            "lookup engine ready"
        );
        Ok(engine)
    }

    /// Look up a flow by raw key.
    ///
    /// # Errors
    /// `EmptyKey` for a zero-length key; absence is `Ok(None)`, not an
    /// error.
    pub fn lookup(&self, raw_key: &[u8]) -> Result<Option<Arc<FlowRecord>>, RegistryError> {
        let started = Instant::now();
        let key = FlowKey::canonical(raw_key, self.digest)?;

        if !self.bloom.read().maybe_contains(&key) {
            self.metrics
                .record_lookup(started.elapsed(), LookupOutcome::BloomReject);
            return Ok(None);
        }

        if let Some(record) = self.cache.get(&key) {
            self.metrics
                .record_lookup(started.elapsed(), LookupOutcome::CacheHit);
            return Ok(Some(record));
        }

        match self.matcher.lookup(&key) {
            Some(record) => {
                self.cache.put(key, Arc::clone(&record));
                self.metrics.set_cache_entries(self.cache.len() as u64);
                self.metrics
                    .record_lookup(started.elapsed(), LookupOutcome::MatcherHit);
                Ok(Some(record))
            }
            None => {
                self.metrics
                    .record_lookup(started.elapsed(), LookupOutcome::MatcherMiss);
                Ok(None)
            }
        }
    }

    /// Register (or replace) a flow.
    ///
    /// # Errors
    /// - `EmptyKey` for a zero-length key
    /// - `PriorityOutOfRange` for priority above 7
    /// - `CapacityExceeded` when the matcher is full and the key is new
    pub fn register_flow(
        &self,
        raw_key: &[u8],
        component_id: ComponentId,
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    ) -> Result<(), RegistryError> {
        let started = Instant::now();
        let outcome = self.register_inner(raw_key, component_id, flow_type, size_bytes, priority);
        self.metrics
            .record_registration(started.elapsed(), outcome.is_ok());
        outcome
    }

    fn register_inner(
        &self,
        raw_key: &[u8],
        component_id: ComponentId,
        flow_type: FlowType,
        size_bytes: u64,
        priority: u8,
    ) -> Result<(), RegistryError> {
        if priority > MAX_FLOW_PRIORITY {
            return Err(RegistryError::PriorityOutOfRange {
                priority,
                max: MAX_FLOW_PRIORITY,
            });
        }
        let key = FlowKey::canonical(raw_key, self.digest)?;
        let record = Arc::new(FlowRecord::new(component_id, flow_type, size_bytes, priority));

        let replaced = self.matcher.register(key, Arc::clone(&record))?;
        if !replaced {
            // A replaced key already passes the filter; re-inserting would
            // only burn bits.
            let mut bloom = self.bloom.write();
            bloom.insert(&key);
            self.metrics.set_bloom_generations(bloom.generation_count() as u64);
        }
        self.cache.put(key, record);

        self.metrics.set_active_flows(self.matcher.len() as u64);
        self.metrics.set_cache_entries(self.cache.len() as u64);
        Ok(())
    }

    /// Remove a flow by raw key. Returns whether it was registered.
    ///
    /// The filter is left untouched: a stale positive just falls through to
    /// the matcher and answers "absent" there.
    pub fn remove_flow(&self, raw_key: &[u8]) -> Result<bool, RegistryError> {
        let key = FlowKey::canonical(raw_key, self.digest)?;
        let removed = self.matcher.remove(&key).is_some();
        self.cache.remove(&key);
        self.metrics.set_active_flows(self.matcher.len() as u64);
        self.metrics.set_cache_entries(self.cache.len() as u64);
        Ok(removed)
    }

    /// Number of registered flows (the `active_flows` gauge).
    pub fn active_flows(&self) -> usize {
        self.matcher.len()
    }

    /// Configured matcher capacity.
    pub fn matcher_capacity(&self) -> usize {
        self.matcher.capacity()
    }

    /// The shared metrics collector.
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}
