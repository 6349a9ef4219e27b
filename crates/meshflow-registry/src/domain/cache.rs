//! Bounded, policy-driven acceleration cache for repeat lookups.
//!
//! Sixteen mutex shards keep mutation local; entry-count and charged-byte
//! accounting is global (atomics), so the configured bounds hold exactly
//! regardless of how keys distribute. The cache is never the source of
//! truth: a miss simply falls through to the exact matcher.

use crate::config::CacheSettings;
use crate::domain::digest::FlowKey;
use crate::domain::eviction::{new_policy_index, PolicyIndex};
use meshflow_telemetry::MetricsCollector;
use parking_lot::Mutex;
use shared_types::FlowRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const CACHE_SHARDS: usize = 16;

/// Fixed per-entry charge covering key, entry struct, and index slot.
const ENTRY_BASE_BYTES: usize = 128;

/// One cached record plus the metadata the bounds need.
///
/// Policy-specific metadata (recency order, hit counts) lives in the
/// shard's policy index, not here.
pub(crate) struct CacheEntry {
    pub record: Arc<FlowRecord>,
    pub inserted_at: Instant,
    pub charged_bytes: usize,
}

struct CacheShard {
    entries: HashMap<FlowKey, CacheEntry>,
    policy: Box<dyn PolicyIndex>,
}

/// Sharded flow cache with a fixed eviction policy and optional TTL.
pub struct FlowCache {
    shards: Vec<Mutex<CacheShard>>,
    max_entries: usize,
    max_memory_bytes: usize,
    ttl: Option<Duration>,
    entry_count: AtomicUsize,
    memory_bytes: AtomicUsize,
    metrics: Arc<MetricsCollector>,
}

impl FlowCache {
    /// Build a cache from validated settings.
    pub fn new(settings: &CacheSettings, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            shards: (0..CACHE_SHARDS)
                .map(|_| {
                    Mutex::new(CacheShard {
                        entries: HashMap::new(),
                        policy: new_policy_index(settings.eviction_policy),
                    })
                })
                .collect(),
            max_entries: settings.max_entries,
            max_memory_bytes: settings.max_memory_bytes,
            ttl: settings.ttl(),
            entry_count: AtomicUsize::new(0),
            memory_bytes: AtomicUsize::new(0),
            metrics,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Fetch a record. Expired entries are treated as absent and purged on
    /// the spot.
    pub fn get(&self, key: &FlowKey) -> Option<Arc<FlowRecord>> {
        let shard_idx = key.shard(CACHE_SHARDS);
        let mut shard = self.shards[shard_idx].lock();
        let CacheShard { entries, policy } = &mut *shard;

        match entries.get(key) {
            None => return None,
            // Fall through only when the entry has outlived its TTL.
            Some(entry) if self.is_expired(entry) => {}
            Some(entry) => {
                policy.on_access(key);
                return Some(Arc::clone(&entry.record));
            }
        }

        if let Some(entry) = entries.remove(key) {
            policy.on_remove(key);
            self.entry_count.fetch_sub(1, Ordering::AcqRel);
            self.memory_bytes.fetch_sub(entry.charged_bytes, Ordering::AcqRel);
            self.metrics.record_cache_expired();
        }
        None
    }

    /// Insert or replace a record, then enforce the configured bounds.
    ///
    /// Exceeding the entry bound evicts exactly one entry; exceeding the
    /// byte bound evicts until the cache fits again (a single entry larger
    /// than the whole bound is kept rather than thrashed).
    pub fn put(&self, key: FlowKey, record: Arc<FlowRecord>) {
        let charged_bytes = ENTRY_BASE_BYTES + record.size_bytes as usize;
        let shard_idx = key.shard(CACHE_SHARDS);
        {
            let mut shard = self.shards[shard_idx].lock();
            let CacheShard { entries, policy } = &mut *shard;

            if let Some(old) = entries.remove(&key) {
                policy.on_remove(&key);
                self.entry_count.fetch_sub(1, Ordering::AcqRel);
                self.memory_bytes.fetch_sub(old.charged_bytes, Ordering::AcqRel);
            }
            entries.insert(
                key,
                CacheEntry {
                    record,
                    inserted_at: Instant::now(),
                    charged_bytes,
                },
            );
            policy.on_insert(&key);
            self.entry_count.fetch_add(1, Ordering::AcqRel);
            self.memory_bytes.fetch_add(charged_bytes, Ordering::AcqRel);
        }

        if self.entry_count.load(Ordering::Acquire) > self.max_entries {
            self.evict_one(shard_idx, Some(&key));
        }
        while self.memory_bytes.load(Ordering::Acquire) > self.max_memory_bytes {
            if !self.evict_one(shard_idx, Some(&key)) {
                break;
            }
        }
    }

    /// Remove a key, returning whether it was present.
    pub fn remove(&self, key: &FlowKey) -> bool {
        let mut shard = self.shards[key.shard(CACHE_SHARDS)].lock();
        let CacheShard { entries, policy } = &mut *shard;
        match entries.remove(key) {
            Some(entry) => {
                policy.on_remove(key);
                self.entry_count.fetch_sub(1, Ordering::AcqRel);
                self.memory_bytes.fetch_sub(entry.charged_bytes, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Evict one entry, preferring the shard that just grew and scanning
    /// its neighbors only when it has no candidate. Locks are taken one
    /// shard at a time.
    fn evict_one(&self, start_shard: usize, exclude: Option<&FlowKey>) -> bool {
        for offset in 0..CACHE_SHARDS {
            let idx = (start_shard + offset) % CACHE_SHARDS;
            let mut shard = self.shards[idx].lock();
            let CacheShard { entries, policy } = &mut *shard;

            let exclude_here = if idx == start_shard { exclude } else { None };
            if let Some(victim) = policy.pick_victim(entries, exclude_here) {
                if let Some(entry) = entries.remove(&victim) {
                    self.entry_count.fetch_sub(1, Ordering::AcqRel);
                    self.memory_bytes.fetch_sub(entry.charged_bytes, Ordering::AcqRel);
                    self.metrics.record_cache_eviction();
                    return true;
                }
            }
        }
        false
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entry_count.load(Ordering::Acquire)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently charged bytes.
    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes.load(Ordering::Acquire)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock();
            let keys: Vec<FlowKey> = shard.entries.keys().copied().collect();
            for key in keys {
                if let Some(entry) = shard.entries.remove(&key) {
                    shard.policy.on_remove(&key);
                    self.entry_count.fetch_sub(1, Ordering::AcqRel);
                    self.memory_bytes.fetch_sub(entry.charged_bytes, Ordering::AcqRel);
                }
            }
        }
    }

    #[cfg(test)]
    fn set_ttl_for_test(&mut self, ttl: Duration) {
        self.ttl = Some(ttl);
    }
}
