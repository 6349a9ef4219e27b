//! Optimal bloom filter sizing.
//!
//! Standard formulas:
//! - `m = -n*ln(p) / (ln 2)^2`  -- bits for n entries at false-positive rate p
//! - `k = (m/n) * ln 2`         -- hash function count
//! - `p = (1 - e^(-kn/m))^k`    -- predicted rate for given (m, n, k)

use std::f64::consts::LN_2;

/// Sizing for one filter generation.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterParams {
    /// Bit-array size (m).
    pub size_bits: usize,
    /// Hash function count (k).
    pub hash_count: usize,
    /// Predicted false-positive rate at full load.
    pub expected_fpr: f64,
}

/// Compute optimal `(m, k)` for `expected_entries` at `target_fpr`.
///
/// `hash_count_override` pins k instead of deriving it (0 keeps the derived
/// value); m is still sized from the target rate.
pub fn optimal_params(
    expected_entries: usize,
    target_fpr: f64,
    hash_count_override: usize,
) -> FilterParams {
    if expected_entries == 0 {
        return FilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 1.0,
        };
    }

    let n = expected_entries as f64;
    let m = (-n * target_fpr.ln() / (LN_2 * LN_2)).ceil().max(1.0) as usize;

    let k = if hash_count_override > 0 {
        hash_count_override
    } else {
        (((m as f64 / n) * LN_2).round() as usize).clamp(1, 32)
    };

    FilterParams {
        size_bits: m,
        hash_count: k,
        expected_fpr: predicted_fpr(m, expected_entries, k),
    }
}

/// Predicted false-positive rate for a filter of `m` bits holding `n`
/// entries with `k` hash functions.
pub fn predicted_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
