//! The authoritative exact-match flow store.
//!
//! The key space is partitioned into 64 shards selected from the canonical
//! key bytes, each behind its own read-write lock, so lookups in one shard
//! never wait on registrations in another. A single atomic length keeps the
//! `active_flows` gauge exact across shards.

use crate::domain::digest::FlowKey;
use crate::error::RegistryError;
use parking_lot::RwLock;
use shared_types::FlowRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SHARD_COUNT: usize = 64;

/// Concurrent key→record store; the single source of truth for lookups.
#[derive(Debug)]
pub struct ExactMatcher {
    shards: Vec<RwLock<HashMap<FlowKey, Arc<FlowRecord>>>>,
    max_entries: usize,
    len: AtomicUsize,
}

impl ExactMatcher {
    /// Create a matcher bounded at `max_entries` flows.
    pub fn new(max_entries: usize) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            max_entries,
            len: AtomicUsize::new(0),
        }
    }

    fn shard(&self, key: &FlowKey) -> &RwLock<HashMap<FlowKey, Arc<FlowRecord>>> {
        &self.shards[key.shard(SHARD_COUNT)]
    }

    /// Register `record` under `key`, replacing any previous record
    /// atomically (last write wins).
    ///
    /// Returns whether an existing record was replaced.
    ///
    /// # Errors
    /// `CapacityExceeded` when the key is new and the matcher is full.
    pub fn register(
        &self,
        key: FlowKey,
        record: Arc<FlowRecord>,
    ) -> Result<bool, RegistryError> {
        let mut shard = self.shard(&key).write();
        if let Some(existing) = shard.get_mut(&key) {
            *existing = record;
            return Ok(true);
        }

        // Claim a slot before inserting so the bound holds exactly even
        // with concurrent registrations into other shards.
        let previous = self.len.fetch_add(1, Ordering::AcqRel);
        if previous >= self.max_entries {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return Err(RegistryError::CapacityExceeded {
                capacity: self.max_entries,
            });
        }
        shard.insert(key, record);
        Ok(false)
    }

    /// Look up the record for `key`.
    pub fn lookup(&self, key: &FlowKey) -> Option<Arc<FlowRecord>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Remove the record for `key`, returning it if present.
    pub fn remove(&self, key: &FlowKey) -> Option<Arc<FlowRecord>> {
        let removed = self.shard(key).write().remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Number of registered flows.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether no flows are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
