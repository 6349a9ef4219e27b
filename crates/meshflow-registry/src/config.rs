//! Registry configuration with validation.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use shared_types::DigestAlgorithm;
use std::time::Duration;

/// Which entry the cache removes when a bound is exceeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Remove the least recently used entry.
    #[default]
    Lru,
    /// Remove the least frequently used entry.
    Lfu,
    /// Remove the oldest entry by arrival order.
    Fifo,
    /// Remove a uniformly random entry.
    Random,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Random => "random",
        }
    }
}

/// Settings for the authoritative exact matcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatcherSettings {
    /// Maximum number of flows the matcher holds. Independent of the cache
    /// bound.
    pub max_entries: usize,
    /// Digest used to canonicalize keys longer than 32 bytes.
    pub digest_algorithm: DigestAlgorithm,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            max_entries: 1_048_576,
            digest_algorithm: DigestAlgorithm::default(),
        }
    }
}

/// Settings for the negative-lookup filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomSettings {
    /// Target false-positive rate each generation is sized for.
    pub target_fpr: f64,
    /// Expected entries for the first generation; later generations double.
    pub expected_entries: usize,
    /// Hash function count; 0 derives the optimum from (n, fpr).
    pub hash_count: usize,
    /// Rotation stops once this many generations exist.
    pub max_generations: usize,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            target_fpr: 0.01,
            expected_entries: 65_536,
            hash_count: 0,
            max_generations: 16,
        }
    }
}

/// Settings for the acceleration cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum cached entries across all shards.
    pub max_entries: usize,
    /// Maximum charged bytes across all shards.
    pub max_memory_bytes: usize,
    /// Victim selection strategy, fixed at construction.
    pub eviction_policy: EvictionPolicy,
    /// Entry lifetime in seconds; 0 disables expiry.
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_memory_bytes: 100 * 1024 * 1024,
            eviction_policy: EvictionPolicy::default(),
            ttl_seconds: 0,
        }
    }
}

impl CacheSettings {
    /// TTL as a duration, `None` when expiry is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }
}

/// Full registry configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub matcher: MatcherSettings,
    pub bloom: BloomSettings,
    pub cache: CacheSettings,
}

impl RegistryConfig {
    /// Validate every bound before the registry is built.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.matcher.max_entries == 0 {
            return Err(RegistryError::InvalidConfig(
                "matcher.max_entries must be at least 1".into(),
            ));
        }
        if !(self.bloom.target_fpr > 0.0 && self.bloom.target_fpr < 1.0) {
            return Err(RegistryError::InvalidConfig(format!(
                "bloom.target_fpr must be in (0, 1), got {}",
                self.bloom.target_fpr
            )));
        }
        if self.bloom.expected_entries == 0 {
            return Err(RegistryError::InvalidConfig(
                "bloom.expected_entries must be at least 1".into(),
            ));
        }
        if self.bloom.hash_count > 32 {
            return Err(RegistryError::InvalidConfig(format!(
                "bloom.hash_count must be at most 32, got {}",
                self.bloom.hash_count
            )));
        }
        if self.bloom.max_generations == 0 {
            return Err(RegistryError::InvalidConfig(
                "bloom.max_generations must be at least 1".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(RegistryError::InvalidConfig(
                "cache.max_entries must be at least 1".into(),
            ));
        }
        if self.cache.max_memory_bytes == 0 {
            return Err(RegistryError::InvalidConfig(
                "cache.max_memory_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
