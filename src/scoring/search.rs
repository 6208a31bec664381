//! Direct SEEK code search over identified individuals.

use crate::error::Result;
use crate::seek::{SeekScorer, TraitCode};
use crate::store::{IndividualId, Store};
use serde::Serialize;
use std::cmp::Ordering;

/// One individual matched by a code search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Matched individual.
    pub individual: IndividualId,
    /// Individual name.
    pub name: String,
    /// SEEK score against the individual's latest code.
    pub score: f64,
    /// The individual's latest code.
    pub seek_code: TraitCode,
}

/// Score `code` against every sighted individual's latest code.
///
/// Excluded (NaN) individuals are dropped; hits are sorted by descending
/// score with ties kept in individual order.
pub fn search_code(
    store: &dyn Store,
    scorer: &SeekScorer,
    code: &TraitCode,
    binary: bool,
) -> Result<Vec<SearchHit>> {
    let mut candidates = Vec::new();
    for individual in store.sighted_individuals()? {
        if let Some(latest) = store.latest_trait_code(individual.id)? {
            candidates.push((individual, latest));
        }
    }
    let codes: Vec<TraitCode> = candidates.iter().map(|(_, c)| *c).collect();
    let scores = scorer.score(code, &codes, binary);

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .zip(scores)
        .filter(|(_, score)| !score.is_nan())
        .map(|((individual, seek_code), score)| SearchHit {
            individual: individual.id,
            name: individual.name,
            score,
            seek_code,
        })
        .collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(hits)
}
