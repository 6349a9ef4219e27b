//! Generation rotation for the bloom filter.
//!
//! A single filter saturates as the key set grows past what it was sized
//! for. Instead of a stop-the-world rebuild, a fresh generation (sized for
//! twice the previous expectation) starts absorbing inserts, and lookups OR
//! across every live generation. A generation is only droppable once its
//! keys are provably represented elsewhere; since keys are never migrated,
//! generations stay live and rotation simply stops at `max_generations` —
//! the no-false-negative guarantee is never traded for space.

use crate::domain::bloom::BloomFilter;
use crate::domain::digest::FlowKey;
use tracing::warn;

/// Append-only arena of filter generations, newest last.
#[derive(Debug)]
pub struct GenerationalBloom {
    generations: Vec<BloomFilter>,
    target_fpr: f64,
    hash_count_override: usize,
    max_generations: usize,
    saturation_warned: bool,
}

impl GenerationalBloom {
    /// Create with a first generation sized for `expected_entries`.
    pub fn new(
        expected_entries: usize,
        target_fpr: f64,
        hash_count_override: usize,
        max_generations: usize,
    ) -> Self {
        Self {
            generations: vec![BloomFilter::sized_for(
                expected_entries,
                target_fpr,
                hash_count_override,
            )],
            target_fpr,
            hash_count_override,
            max_generations,
            saturation_warned: false,
        }
    }

    fn newest(&mut self) -> &mut BloomFilter {
        self.generations
            .last_mut()
            .unwrap_or_else(|| unreachable!("constructed with one generation"))
    }

    /// Insert a key, rotating in a new generation first if the newest one
    /// has absorbed the load it was sized for.
    pub fn insert(&mut self, key: &FlowKey) {
        let newest = self
            .generations
            .last()
            .unwrap_or_else(|| unreachable!("constructed with one generation"));

        if newest.inserted() >= newest.capacity_hint() {
            if self.generations.len() < self.max_generations {
                let next_size = newest.capacity_hint().saturating_mul(2).max(1);
                self.generations.push(BloomFilter::sized_for(
                    next_size,
                    self.target_fpr,
                    self.hash_count_override,
                ));
            } else if !self.saturation_warned {
                self.saturation_warned = true;
                warn!(
                    generations = self.generations.len(),
                    "filter generation limit reached; false-positive rate will degrade"
                );
            }
        }

        self.newest().insert(key);
    }

    /// Test membership across all generations (logical OR).
    ///
    /// `false` means the key was definitely never inserted.
    pub fn maybe_contains(&self, key: &FlowKey) -> bool {
        self.generations.iter().any(|g| g.maybe_contains(key))
    }

    /// Number of live generations.
    pub fn generation_count(&self) -> usize {
        self.generations.len()
    }

    /// Predicted false-positive rate: the complement of every generation
    /// answering "absent".
    pub fn predicted_fpr(&self) -> f64 {
        let none_fp: f64 = self
            .generations
            .iter()
            .map(|g| 1.0 - g.predicted_fpr())
            .product();
        1.0 - none_fp
    }
}
