//! Canonical flow keys and the digest strategies behind them.
//!
//! Raw keys up to 32 bytes are used verbatim; anything longer is replaced by
//! a fixed 32-byte digest before any structural use. Digest equality is
//! treated as key equality, so two long keys that collide overwrite each
//! other — an accepted tradeoff documented on [`FlowKey`].

use crate::error::RegistryError;
use shared_types::DigestAlgorithm;
use std::fmt;
use std::hash::Hasher as _;
use std::io::Cursor;

/// Keys at or below this length are stored without digesting.
pub const MAX_INLINE_KEY_LEN: usize = 32;

/// A canonicalized flow key: at most 32 bytes, either the raw key or its
/// digest.
///
/// For raw keys longer than [`MAX_INLINE_KEY_LEN`] the stored bytes are a
/// digest, and digest equality is key equality: a collision between two
/// distinct long keys silently overwrites. The window is negligible for
/// SHA-256 and small for the faster algorithms; callers that cannot accept
/// it should keep keys within 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    bytes: [u8; MAX_INLINE_KEY_LEN],
    len: u8,
}

impl FlowKey {
    /// Canonicalize a raw key with the given strategy.
    ///
    /// # Errors
    /// `EmptyKey` if `raw` has no bytes.
    pub fn canonical(raw: &[u8], digest: &dyn DigestStrategy) -> Result<Self, RegistryError> {
        if raw.is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if raw.len() <= MAX_INLINE_KEY_LEN {
            let mut bytes = [0u8; MAX_INLINE_KEY_LEN];
            bytes[..raw.len()].copy_from_slice(raw);
            Ok(Self {
                bytes,
                len: raw.len() as u8,
            })
        } else {
            Ok(Self {
                bytes: digest.digest(raw),
                len: MAX_INLINE_KEY_LEN as u8,
            })
        }
    }

    /// The canonical bytes (raw key or digest).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Shard selector: an FNV-1a fold of the canonical bytes, reduced
    /// modulo `shard_count`.
    pub fn shard(&self, shard_count: usize) -> usize {
        let mut h = 0xcbf2_9ce4_8422_2325u64;
        for b in self.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (h % shard_count as u64) as usize
    }
}

impl fmt::Debug for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowKey({})", hex::encode(self.as_bytes()))
    }
}

/// Digest strategy for keys longer than 32 bytes.
///
/// One implementation exists per configurable algorithm; the engine selects
/// one at construction and holds it for its lifetime.
pub trait DigestStrategy: Send + Sync {
    /// Produce a 32-byte digest of `raw`.
    fn digest(&self, raw: &[u8]) -> [u8; MAX_INLINE_KEY_LEN];

    /// Stable name for logs.
    fn name(&self) -> &'static str;
}

/// SHA-256: collision-resistant, slowest of the three.
pub struct Sha256Digest;

impl DigestStrategy for Sha256Digest {
    fn digest(&self, raw: &[u8]) -> [u8; MAX_INLINE_KEY_LEN] {
        use sha2::{Digest, Sha256};
        Sha256::digest(raw).into()
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}

/// MurmurHash3 x64 128-bit, widened to 32 bytes with two seeded passes.
pub struct Murmur3Digest;

impl Murmur3Digest {
    fn pass(raw: &[u8], seed: u32) -> u128 {
        // Cursor reads from a slice cannot fail.
        murmur3::murmur3_x64_128(&mut Cursor::new(raw), seed).unwrap_or(0)
    }
}

impl DigestStrategy for Murmur3Digest {
    fn digest(&self, raw: &[u8]) -> [u8; MAX_INLINE_KEY_LEN] {
        let mut out = [0u8; MAX_INLINE_KEY_LEN];
        out[..16].copy_from_slice(&Self::pass(raw, 0).to_le_bytes());
        out[16..].copy_from_slice(&Self::pass(raw, 1).to_le_bytes());
        out
    }

    fn name(&self) -> &'static str {
        "murmur3"
    }
}

/// SipHash-2-4, widened to 32 bytes with four keyed passes.
pub struct SipHash24Digest;

impl SipHash24Digest {
    fn pass(raw: &[u8], k0: u64, k1: u64) -> u64 {
        let mut hasher = siphasher::sip::SipHasher24::new_with_keys(k0, k1);
        hasher.write(raw);
        hasher.finish()
    }
}

impl DigestStrategy for SipHash24Digest {
    fn digest(&self, raw: &[u8]) -> [u8; MAX_INLINE_KEY_LEN] {
        let mut out = [0u8; MAX_INLINE_KEY_LEN];
        for (i, chunk) in out.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&Self::pass(raw, 0x6d65_7368, i as u64).to_le_bytes());
        }
        out
    }

    fn name(&self) -> &'static str {
        "siphash24"
    }
}

/// The strategy singleton for a configured algorithm.
pub fn strategy_for(algorithm: DigestAlgorithm) -> &'static dyn DigestStrategy {
    match algorithm {
        DigestAlgorithm::Sha256 => &Sha256Digest,
        DigestAlgorithm::Murmur3 => &Murmur3Digest,
        DigestAlgorithm::SipHash24 => &SipHash24Digest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strategies() -> [&'static dyn DigestStrategy; 3] {
        [&Sha256Digest, &Murmur3Digest, &SipHash24Digest]
    }

    #[test]
    fn test_empty_key_rejected() {
        for strategy in strategies() {
            assert_eq!(
                FlowKey::canonical(b"", strategy),
                Err(RegistryError::EmptyKey),
                "{} must reject empty keys",
                strategy.name()
            );
        }
    }

    #[test]
    fn test_short_key_kept_verbatim() {
        let key = FlowKey::canonical(b"flow-1", &Sha256Digest).expect("valid key");
        assert_eq!(key.as_bytes(), b"flow-1");
    }

    #[test]
    fn test_boundary_key_kept_verbatim() {
        let raw = [0xab; MAX_INLINE_KEY_LEN];
        let key = FlowKey::canonical(&raw, &Sha256Digest).expect("valid key");
        assert_eq!(key.as_bytes(), &raw);
    }

    #[test]
    fn test_long_key_digested_to_32_bytes() {
        let raw = vec![7u8; 100];
        for strategy in strategies() {
            let key = FlowKey::canonical(&raw, strategy).expect("valid key");
            assert_eq!(
                key.as_bytes().len(),
                MAX_INLINE_KEY_LEN,
                "{} digest must be exactly 32 bytes",
                strategy.name()
            );
            assert_ne!(key.as_bytes(), &raw[..32], "digest differs from prefix");
        }
    }

    #[test]
    fn test_strategies_disagree_on_long_keys() {
        let raw = vec![1u8; 64];
        let a = FlowKey::canonical(&raw, &Sha256Digest).unwrap();
        let b = FlowKey::canonical(&raw, &Murmur3Digest).unwrap();
        let c = FlowKey::canonical(&raw, &SipHash24Digest).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_shard_in_range() {
        let key = FlowKey::canonical(b"any", &Sha256Digest).unwrap();
        for count in [1usize, 16, 64] {
            assert!(key.shard(count) < count);
        }
    }

    proptest! {
        #[test]
        fn prop_canonicalization_is_deterministic(raw in prop::collection::vec(any::<u8>(), 1..200)) {
            for strategy in strategies() {
                let a = FlowKey::canonical(&raw, strategy).unwrap();
                let b = FlowKey::canonical(&raw, strategy).unwrap();
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn prop_canonical_len_bounded(raw in prop::collection::vec(any::<u8>(), 1..200)) {
            let key = FlowKey::canonical(&raw, &Murmur3Digest).unwrap();
            prop_assert!(key.as_bytes().len() <= MAX_INLINE_KEY_LEN);
            if raw.len() <= MAX_INLINE_KEY_LEN {
                prop_assert_eq!(key.as_bytes(), &raw[..]);
            }
        }
    }
}
