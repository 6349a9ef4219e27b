//! Pure registry domain logic: keys, matcher, filter, cache.

pub mod bloom;
pub mod cache;
pub mod digest;
mod eviction;
pub mod generations;
pub mod matcher;
pub mod parameters;

pub use bloom::BloomFilter;
pub use cache::FlowCache;
pub use digest::{strategy_for, DigestStrategy, FlowKey, MAX_INLINE_KEY_LEN};
pub use generations::GenerationalBloom;
pub use matcher::ExactMatcher;
pub use parameters::{optimal_params, predicted_fpr, FilterParams};
