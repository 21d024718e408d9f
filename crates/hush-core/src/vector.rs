use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;
use crate::time::Timestamp;

/// Abstracted, comparable encoding of an arbitrary input.
///
/// `magnitude` measures the input's size, `entropy_rate` its internal
/// variety in [0, 1], `observed_at` when it was seen. Vectors are immutable
/// once created; merging produces a new vector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Vector {
    pub magnitude: f64,
    pub entropy_rate: f64,
    pub observed_at: Timestamp,
}

impl Vector {
    /// Entropy rate is clamped to [0, 1] at construction so no vector can
    /// carry an out-of-range value.
    pub fn new(magnitude: f64, entropy_rate: f64, observed_at: Timestamp) -> Self {
        Self {
            magnitude,
            entropy_rate: entropy_rate.clamp(0.0, 1.0),
            observed_at,
        }
    }

    /// The canonical identity/silence vector: no magnitude, maximal entropy,
    /// epoch timestamp. Returned whenever no knowledge exists.
    pub fn zero() -> Self {
        Self {
            magnitude: 0.0,
            entropy_rate: 1.0,
            observed_at: Timestamp::EPOCH,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.abs() < EPSILON
    }

    /// Asymmetric merge: the first operand keeps its full magnitude, the
    /// second contributes half. NOT commutative: folding a sequence of
    /// vectors therefore depends on order, which downstream accumulation
    /// relies on. Entropy rates are averaged; the later timestamp wins.
    pub fn biased_merge(self, other: Self) -> Self {
        Self {
            magnitude: self.magnitude + other.magnitude / 2.0,
            entropy_rate: (self.entropy_rate + other.entropy_rate) / 2.0,
            observed_at: self.observed_at.later(other.observed_at),
        }
    }

    /// Deterministic identity hash over the comparable fields.
    ///
    /// Polynomial rolling hash (base 31, wrapping u64) over a fixed-precision
    /// serialization of magnitude and entropy_rate. `observed_at` is
    /// freshness, not identity, and is deliberately excluded: re-registering
    /// content that abstracts to the same vector collapses to one entry.
    /// Identity only, never a security boundary.
    pub fn identity_hash(&self) -> String {
        let serialized = format!("{:.6}|{:.6}", self.magnitude, self.entropy_rate);
        let mut hash: u64 = 0;
        for byte in serialized.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(byte as u64);
        }
        format!("{hash:016x}")
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        (self.magnitude - other.magnitude).abs() < EPSILON
            && (self.entropy_rate - other.entropy_rate).abs() < EPSILON
            && self.observed_at == other.observed_at
    }
}
