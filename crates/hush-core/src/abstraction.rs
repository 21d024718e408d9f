//! Input abstraction: raw signals to vectors.
//!
//! The mapping is fully deterministic: magnitude comes from the input's
//! size, entropy rate from a content signature (type-token ratio for text,
//! a bit-fold for numeric measures). Variability, where wanted, is injected
//! by callers and never here, so abstraction output is stable enough to key
//! the knowledge base.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::MAGNITUDE_SCALE;
use crate::time::Timestamp;
use crate::vector::Vector;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// A raw input to the agent.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// Nothing; abstracts to the zero vector.
    Empty,
    /// Free text (dialogue turns, fetched source payloads).
    Text(String),
    /// A source-provided numeric measure.
    Measure(f64),
}

impl Signal {
    /// Build a text signal; blank text collapses to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Signal::Empty
        } else {
            Signal::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Signal::Empty => true,
            Signal::Text(s) => s.trim().is_empty(),
            Signal::Measure(_) => false,
        }
    }
}

/// Tokenize text into lowercase words. Preserves apostrophes within words
/// (e.g. "don't"). No stemming, no stop-word removal.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Abstract a signal into a vector. Fails closed: empty input yields the
/// zero vector; every call returns a fully-populated vector and none errors.
pub fn abstract_signal(signal: &Signal, observed_at: Timestamp) -> Vector {
    match signal {
        Signal::Empty => Vector::zero(),
        Signal::Text(text) => abstract_text(text, observed_at),
        Signal::Measure(value) => abstract_measure(*value, observed_at),
    }
}

/// Magnitude from scaled character length, entropy rate from the type-token
/// ratio: unique tokens over total tokens, naturally in [0, 1]. Repetitive
/// text scores low, varied text scores high.
fn abstract_text(text: &str, observed_at: Timestamp) -> Vector {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Vector::zero();
    }

    let magnitude = text.chars().count() as f64 * MAGNITUDE_SCALE;

    let mut seen = std::collections::HashSet::new();
    let unique = tokens.iter().filter(|t| seen.insert(t.as_str())).count();
    let entropy_rate = unique as f64 / tokens.len() as f64;

    Vector::new(magnitude, entropy_rate, observed_at)
}

/// Magnitude is the measure itself (absolute); entropy rate is a
/// deterministic fold of the measure's bit pattern into [0, 1].
fn abstract_measure(value: f64, observed_at: Timestamp) -> Vector {
    let magnitude = value.abs();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return Vector::zero();
    }

    let mut folded: u64 = 0;
    for byte in value.to_bits().to_be_bytes() {
        folded = folded.wrapping_mul(31).wrapping_add(byte as u64);
    }
    let entropy_rate = (folded % 1_000) as f64 / 1_000.0;

    Vector::new(magnitude, entropy_rate, observed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EPSILON;

    #[test]
    fn test_empty_signal_is_zero_vector() {
        let v = abstract_signal(&Signal::Empty, Timestamp(100));
        assert!(v.is_zero());
        assert_eq!(v.observed_at, Timestamp::EPOCH);
    }

    #[test]
    fn test_blank_text_collapses_to_empty() {
        assert_eq!(Signal::text("   \t\n"), Signal::Empty);
        assert!(Signal::text("").is_empty());
        assert!(!Signal::text("hello").is_empty());
    }

    #[test]
    fn test_text_magnitude_scales_with_length() {
        let short = abstract_signal(&Signal::text("hi there"), Timestamp(1));
        let long = abstract_signal(
            &Signal::text("a considerably longer line of input text"),
            Timestamp(1),
        );
        assert!(long.magnitude > short.magnitude);
    }

    #[test]
    fn test_text_entropy_is_type_token_ratio() {
        let varied = abstract_signal(&Signal::text("one two three four"), Timestamp(1));
        assert!((varied.entropy_rate - 1.0).abs() < EPSILON);

        let repetitive = abstract_signal(&Signal::text("same same same same"), Timestamp(1));
        assert!((repetitive.entropy_rate - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_abstraction_is_deterministic() {
        let a = abstract_signal(&Signal::text("hello world"), Timestamp(5));
        let b = abstract_signal(&Signal::text("hello world"), Timestamp(5));
        assert_eq!(a, b);
        assert_eq!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn test_punctuation_only_text_is_zero() {
        let v = abstract_signal(&Signal::Text("?!.,;".to_string()), Timestamp(1));
        assert!(v.is_zero());
    }

    #[test]
    fn test_measure_abstraction() {
        let v = abstract_signal(&Signal::Measure(42.5), Timestamp(7));
        assert!((v.magnitude - 42.5).abs() < EPSILON);
        assert!(v.entropy_rate >= 0.0 && v.entropy_rate <= 1.0);
        assert_eq!(v.observed_at, Timestamp(7));
    }

    #[test]
    fn test_measure_negative_uses_absolute() {
        let v = abstract_signal(&Signal::Measure(-3.0), Timestamp(1));
        assert!((v.magnitude - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_measure_zero_and_nonfinite_fail_closed() {
        assert!(abstract_signal(&Signal::Measure(0.0), Timestamp(1)).is_zero());
        assert!(abstract_signal(&Signal::Measure(f64::NAN), Timestamp(1)).is_zero());
        assert!(abstract_signal(&Signal::Measure(f64::INFINITY), Timestamp(1)).is_zero());
    }

    #[test]
    fn test_tokenize_basics() {
        assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
        assert_eq!(tokenize("Don't stop"), vec!["don't", "stop"]);
        assert_eq!(tokenize("'quoted'"), vec!["quoted"]);
        assert!(tokenize("").is_empty());
    }
}
