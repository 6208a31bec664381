//! SEEK code similarity scoring.

use crate::constants::scoring::WILDCARD_PENALTY;
use crate::constants::seek::SLOTS;
use crate::seek::TraitCode;

/// Scores a query code against database codes.
#[derive(Debug, Clone, Copy)]
pub struct SeekScorer {
    wildcard_penalty: f64,
}

impl Default for SeekScorer {
    fn default() -> Self {
        Self::new(WILDCARD_PENALTY)
    }
}

impl SeekScorer {
    /// Create a scorer with the given penalty per unit of database wildcard fraction.
    pub const fn new(wildcard_penalty: f64) -> Self {
        Self { wildcard_penalty }
    }

    /// Score every database code against `query`, preserving order.
    ///
    /// `score = matching_fraction - penalty * database_wildcard_fraction`.
    /// Two wildcards in the same slot count as a match. In `binary` mode a
    /// code that disagrees with the query on any slot known on both sides is
    /// excluded (NaN) instead of down-weighted.
    pub fn score(&self, query: &TraitCode, codes: &[TraitCode], binary: bool) -> Vec<f64> {
        codes
            .iter()
            .map(|code| {
                if binary && conflicts(query, code) {
                    return f64::NAN;
                }
                let mut matches = 0usize;
                let mut wildcards = 0usize;
                for (q, d) in query.slots().iter().zip(code.slots()) {
                    if q == d {
                        matches += 1;
                    }
                    if d.is_none() {
                        wildcards += 1;
                    }
                }
                let n = SLOTS as f64;
                (matches as f64 / n) - self.wildcard_penalty * (wildcards as f64 / n)
            })
            .collect()
    }
}

/// Whether two codes disagree on a slot where neither side is a wildcard.
pub fn conflicts(a: &TraitCode, b: &TraitCode) -> bool {
    a.slots()
        .iter()
        .zip(b.slots())
        .any(|(x, y)| matches!((x, y), (Some(x), Some(y)) if x != y))
}

/// Score with the default wildcard penalty.
pub fn seek_score(query: &TraitCode, codes: &[TraitCode], binary: bool) -> Vec<f64> {
    SeekScorer::default().score(query, codes, binary)
}
