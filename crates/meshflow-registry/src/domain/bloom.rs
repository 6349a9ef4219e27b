//! Single-generation bloom filter.
//!
//! Space-efficient probabilistic membership with one hard guarantee: a key
//! that was inserted always tests positive. False positives happen at a
//! rate governed by the sizing in [`crate::domain::parameters`]; they cost
//! a wasted exact-matcher probe, never a wrong answer.

use crate::domain::digest::FlowKey;
use crate::domain::parameters::{optimal_params, predicted_fpr};
use bitvec::prelude::*;
use std::io::Cursor;

/// Double-hashing position generator: `h(i) = h1 + i*h2 (mod m)`.
///
/// Two murmur3 passes with distinct seeds are cheaper than k independent
/// hashes and preserve the independence the sizing math assumes.
fn hash_positions(key: &FlowKey, k: usize, m: usize) -> impl Iterator<Item = usize> {
    fn pass(bytes: &[u8], seed: u32) -> u64 {
        // Cursor reads from a slice cannot fail.
        murmur3::murmur3_x64_128(&mut Cursor::new(bytes), seed).unwrap_or(0) as u64
    }

    let h1 = pass(key.as_bytes(), 0);
    let h2 = pass(key.as_bytes(), 1);
    (0..k).map(move |i| (h1.wrapping_add((i as u64).wrapping_mul(h2)) % m as u64) as usize)
}

/// One bloom filter generation.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: BitVec<u8, Lsb0>,
    m: usize,
    k: usize,
    inserted: usize,
    sized_for: usize,
}

impl BloomFilter {
    /// Create a filter sized for `expected_entries` at `target_fpr`.
    ///
    /// `hash_count_override` pins k (0 derives the optimum).
    pub fn sized_for(expected_entries: usize, target_fpr: f64, hash_count_override: usize) -> Self {
        let params = optimal_params(expected_entries, target_fpr, hash_count_override);
        Self {
            bits: bitvec![u8, Lsb0; 0; params.size_bits],
            m: params.size_bits,
            k: params.hash_count,
            inserted: 0,
            sized_for: expected_entries,
        }
    }

    /// Insert a key. Afterwards `maybe_contains(key)` is always true.
    pub fn insert(&mut self, key: &FlowKey) {
        for pos in hash_positions(key, self.k, self.m) {
            self.bits.set(pos, true);
        }
        self.inserted += 1;
    }

    /// Test membership: `false` means definitely absent, `true` means
    /// possibly present.
    pub fn maybe_contains(&self, key: &FlowKey) -> bool {
        hash_positions(key, self.k, self.m).all(|pos| self.bits[pos])
    }

    /// Keys inserted so far (counting re-inserts).
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Entry count this generation was sized for.
    pub fn capacity_hint(&self) -> usize {
        self.sized_for
    }

    /// Fraction of bits set.
    pub fn fill_ratio(&self) -> f64 {
        if self.m == 0 {
            return 1.0;
        }
        self.bits.count_ones() as f64 / self.m as f64
    }

    /// Predicted false-positive rate at the current load.
    pub fn predicted_fpr(&self) -> f64 {
        predicted_fpr(self.m, self.inserted, self.k)
    }

    /// Bit-array size.
    pub fn size_bits(&self) -> usize {
        self.m
    }

    /// Hash function count.
    pub fn hash_count(&self) -> usize {
        self.k
    }
}
