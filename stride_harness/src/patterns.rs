//! Deterministic bit-pattern generation.

use crate::error::HarnessError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A fixed-length message of `'0'`/`'1'` symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern(String);

impl Pattern {
    /// Parses a pattern, rejecting anything but a non-empty run of 0s and 1s.
    pub fn parse(bits: &str) -> Result<Self, HarnessError> {
        if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(HarnessError::invalid(format!("not a bit pattern: {:?}", bits)));
        }
        Ok(Self(bits.to_string()))
    }

    /// The pattern as sent on the agent command line.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed or generated pattern.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First `max` bits, with `...` appended when truncated.
    pub fn preview(&self, max: usize) -> String {
        if self.0.len() > max {
            format!("{}...", &self.0[..max])
        } else {
            self.0.clone()
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates `count` patterns of `length` uniform, independent bits.
///
/// With a seed, the generator is seeded once and the patterns are drawn in
/// order, so the same `(count, length, seed)` always yields the same list.
pub fn generate_patterns(
    count: usize,
    length: usize,
    seed: Option<u64>,
) -> Result<Vec<Pattern>, HarnessError> {
    if count == 0 {
        return Err(HarnessError::invalid("pattern count must be positive"));
    }
    if length == 0 {
        return Err(HarnessError::invalid("pattern length must be positive"));
    }

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let patterns = (0..count)
        .map(|_| {
            let bits: String = (0..length)
                .map(|_| if rng.gen::<bool>() { '1' } else { '0' })
                .collect();
            Pattern(bits)
        })
        .collect();
    Ok(patterns)
}
