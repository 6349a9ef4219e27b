//! Eviction policy strategies for the flow cache.
//!
//! Each policy maintains its own bookkeeping index next to the shard's
//! entry map and answers one question: which entry goes when a bound is
//! exceeded. The strategy is chosen once at cache construction and held
//! for the cache's lifetime.

use crate::config::EvictionPolicy;
use crate::domain::cache::CacheEntry;
use crate::domain::digest::FlowKey;
use lru::LruCache;
use rand::Rng;
use std::collections::{HashMap, VecDeque};

/// Per-shard policy bookkeeping.
pub(crate) trait PolicyIndex: Send {
    /// A new entry landed in the shard.
    fn on_insert(&mut self, key: &FlowKey);

    /// An entry was served from the shard.
    fn on_access(&mut self, key: &FlowKey);

    /// An entry left the shard (explicit remove or TTL purge).
    fn on_remove(&mut self, key: &FlowKey);

    /// Choose and forget a victim among `live`, never `exclude`.
    fn pick_victim(
        &mut self,
        live: &HashMap<FlowKey, CacheEntry>,
        exclude: Option<&FlowKey>,
    ) -> Option<FlowKey>;
}

/// Build the index for a configured policy.
pub(crate) fn new_policy_index(policy: EvictionPolicy) -> Box<dyn PolicyIndex> {
    match policy {
        EvictionPolicy::Lru => Box::new(LruIndex(LruCache::unbounded())),
        EvictionPolicy::Lfu => Box::new(LfuIndex(HashMap::new())),
        EvictionPolicy::Fifo => Box::new(FifoIndex(VecDeque::new())),
        EvictionPolicy::Random => Box::new(RandomIndex),
    }
}

/// Least-recently-used: recency order kept in an unbounded `LruCache`.
struct LruIndex(LruCache<FlowKey, ()>);

impl PolicyIndex for LruIndex {
    fn on_insert(&mut self, key: &FlowKey) {
        self.0.put(*key, ());
    }

    fn on_access(&mut self, key: &FlowKey) {
        self.0.get(key);
    }

    fn on_remove(&mut self, key: &FlowKey) {
        self.0.pop(key);
    }

    fn pick_victim(
        &mut self,
        live: &HashMap<FlowKey, CacheEntry>,
        exclude: Option<&FlowKey>,
    ) -> Option<FlowKey> {
        while let Some((key, ())) = self.0.pop_lru() {
            if Some(&key) == exclude {
                // The just-inserted entry is never the victim; put it back
                // at the most-recent end where it already belonged.
                self.0.put(key, ());
                return None;
            }
            if live.contains_key(&key) {
                return Some(key);
            }
        }
        None
    }
}

/// Least-frequently-used: hit counts per key.
struct LfuIndex(HashMap<FlowKey, u64>);

impl PolicyIndex for LfuIndex {
    fn on_insert(&mut self, key: &FlowKey) {
        self.0.insert(*key, 1);
    }

    fn on_access(&mut self, key: &FlowKey) {
        if let Some(count) = self.0.get_mut(key) {
            *count += 1;
        }
    }

    fn on_remove(&mut self, key: &FlowKey) {
        self.0.remove(key);
    }

    fn pick_victim(
        &mut self,
        live: &HashMap<FlowKey, CacheEntry>,
        exclude: Option<&FlowKey>,
    ) -> Option<FlowKey> {
        let victim = self
            .0
            .iter()
            .filter(|&(key, _)| exclude.map_or(true, |e| key != e) && live.contains_key(key))
            .min_by_key(|&(_, count)| *count)
            .map(|(key, _)| *key)?;
        self.0.remove(&victim);
        Some(victim)
    }
}

/// First-in-first-out: arrival order in a deque.
///
/// Removals are lazy; stale deque slots are skipped when a victim is
/// popped. A replaced key keeps its original arrival position.
struct FifoIndex(VecDeque<FlowKey>);

impl PolicyIndex for FifoIndex {
    fn on_insert(&mut self, key: &FlowKey) {
        self.0.push_back(*key);
    }

    fn on_access(&mut self, _key: &FlowKey) {}

    fn on_remove(&mut self, _key: &FlowKey) {}

    fn pick_victim(
        &mut self,
        live: &HashMap<FlowKey, CacheEntry>,
        exclude: Option<&FlowKey>,
    ) -> Option<FlowKey> {
        let mut skipped_exclude = false;
        let mut victim = None;
        while let Some(key) = self.0.pop_front() {
            if Some(&key) == exclude {
                skipped_exclude = true;
                continue;
            }
            if live.contains_key(&key) {
                victim = Some(key);
                break;
            }
            // Stale slot from a lazy removal or a replacement; skip.
        }
        if skipped_exclude {
            if let Some(key) = exclude {
                self.0.push_front(*key);
            }
        }
        victim
    }
}

/// Uniform-random victim selection; needs no bookkeeping.
struct RandomIndex;

impl PolicyIndex for RandomIndex {
    fn on_insert(&mut self, _key: &FlowKey) {}

    fn on_access(&mut self, _key: &FlowKey) {}

    fn on_remove(&mut self, _key: &FlowKey) {}

    fn pick_victim(
        &mut self,
        live: &HashMap<FlowKey, CacheEntry>,
        exclude: Option<&FlowKey>,
    ) -> Option<FlowKey> {
        let candidates = live.len() - usize::from(exclude.is_some_and(|k| live.contains_key(k)));
        if candidates == 0 {
            return None;
        }
        let pick = rand::thread_rng().gen_range(0..candidates);
        live.keys()
            .filter(|key| Some(*key) != exclude)
            .nth(pick)
            .copied()
    }
}
