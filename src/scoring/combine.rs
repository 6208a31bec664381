//! Weighted combination of evidence channels into ranked, cached results.

use super::embedding::{embedding_scores, individual_embeddings, sighting_embeddings};
use crate::constants::scoring::{LEFT_EAR_WEIGHT, RIGHT_EAR_WEIGHT, SEEK_WEIGHT, WILDCARD_PENALTY};
use crate::error::Result;
use crate::inference::EmbeddingClass;
use crate::seek::{SeekScorer, TraitCode};
use crate::store::{Channel, ScoreRow, ScoringResult, Sighting, SightingId, Store};
use chrono::Utc;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Channel weights and the SEEK wildcard penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringSettings {
    /// Weight of the SEEK channel.
    pub seek_weight: f64,
    /// Weight of the right-ear embedding channel.
    pub right_ear_weight: f64,
    /// Weight of the left-ear embedding channel.
    pub left_ear_weight: f64,
    /// Penalty per unknown slot in a candidate's code.
    pub wildcard_penalty: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            seek_weight: SEEK_WEIGHT,
            right_ear_weight: RIGHT_EAR_WEIGHT,
            left_ear_weight: LEFT_EAR_WEIGHT,
            wildcard_penalty: WILDCARD_PENALTY,
        }
    }
}

impl ScoringSettings {
    /// Weight of one channel.
    pub const fn weight(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Seek => self.seek_weight,
            Channel::Embedding(EmbeddingClass::RightEar) => self.right_ear_weight,
            Channel::Embedding(EmbeddingClass::LeftEar) => self.left_ear_weight,
        }
    }
}

/// Which sightings a scoring run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Sightings without a cached result.
    FillMissing,
    /// Every sighting.
    RecomputeAll,
    /// Exactly these sightings.
    Sightings(Vec<SightingId>),
}

/// Weighted mean over the non-NaN channel scores; NaN if none are present.
pub fn combine_channels(scores: &[f64], weights: &[f64]) -> f64 {
    let (sum, total) = scores
        .iter()
        .zip(weights)
        .filter(|(s, w)| !s.is_nan() && **w > 0.0)
        .fold((0.0, 0.0), |(sum, total), (s, w)| (sum + s * w, total + w));
    if total > 0.0 { sum / total } else { f64::NAN }
}

/// Sort rows by descending combined score, NaN last, keeping candidate order
/// among ties, then assign dense ranks to the non-NaN rows.
pub fn rank_rows(rows: &mut [ScoreRow]) {
    rows.sort_by(|a, b| match (a.combined.is_nan(), b.combined.is_nan()) {
        (false, false) => b.combined.partial_cmp(&a.combined).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    });

    let mut rank = 0;
    let mut previous: Option<f64> = None;
    for row in rows {
        if row.combined.is_nan() {
            row.rank = None;
            continue;
        }
        if previous != Some(row.combined) {
            rank += 1;
            previous = Some(row.combined);
        }
        row.rank = Some(rank);
    }
}

/// Ranks candidate individuals for query sightings and caches the tables.
pub struct Combiner {
    store: Arc<dyn Store>,
    settings: ScoringSettings,
    classes: Vec<EmbeddingClass>,
}

impl Combiner {
    /// Combiner over every embedding class.
    pub fn new(store: Arc<dyn Store>, settings: ScoringSettings) -> Self {
        Self {
            store,
            settings,
            classes: EmbeddingClass::ALL.to_vec(),
        }
    }

    /// Channel order of every result.
    pub fn channels(&self) -> Vec<Channel> {
        std::iter::once(Channel::Seek)
            .chain(self.classes.iter().map(|c| Channel::Embedding(*c)))
            .collect()
    }

    /// Score the sightings `mode` selects and overwrite their cached results.
    ///
    /// Returns the sightings that were scored.
    pub fn run(&self, mode: &ScoreMode) -> Result<Vec<SightingId>> {
        let queries: Vec<Sighting> = match mode {
            ScoreMode::RecomputeAll => self.store.sightings()?,
            ScoreMode::FillMissing => {
                let mut missing = Vec::new();
                for sighting in self.store.sightings()? {
                    if !self.store.has_scoring_result(sighting.id)? {
                        missing.push(sighting);
                    }
                }
                missing
            }
            ScoreMode::Sightings(ids) => ids
                .iter()
                .map(|id| self.store.sighting(*id))
                .collect::<Result<_>>()?,
        };
        if queries.is_empty() {
            debug!("No sightings to score");
            return Ok(Vec::new());
        }

        let results = self.score(&queries)?;
        let mut done = Vec::with_capacity(results.len());
        for result in results {
            let sighting = result.sighting;
            self.store.put_scoring_result(result)?;
            done.push(sighting);
        }
        info!("Scored {} sightings", done.len());
        Ok(done)
    }

    /// Compute ranked results for `queries` without caching them.
    pub fn score(&self, queries: &[Sighting]) -> Result<Vec<ScoringResult>> {
        let store = self.store.as_ref();
        let candidates = store.sighted_individuals()?;
        let codes: Vec<TraitCode> = candidates
            .iter()
            .map(|c| {
                store
                    .latest_trait_code(c.id)
                    .map(Option::unwrap_or_default)
            })
            .collect::<Result<_>>()?;
        debug!(
            "Scoring {} sightings against {} individuals",
            queries.len(),
            candidates.len()
        );

        let seek = SeekScorer::new(self.settings.wildcard_penalty);
        let seek_rows: Vec<Vec<f64>> = queries
            .iter()
            .map(|q| seek.score(&q.seek, &codes, false))
            .collect();

        let mut embedding_matrices: Vec<Array2<f64>> = Vec::with_capacity(self.classes.len());
        for &class in &self.classes {
            let query_groups = queries
                .iter()
                .map(|q| sighting_embeddings(store, q.id, class))
                .collect::<Result<Vec<_>>>()?;
            let candidate_groups = candidates
                .iter()
                .map(|c| individual_embeddings(store, c.id, class))
                .collect::<Result<Vec<_>>>()?;
            embedding_matrices.push(embedding_scores(&query_groups, &candidate_groups)?);
        }

        let channels = self.channels();
        let weights: Vec<f64> = channels.iter().map(|c| self.settings.weight(*c)).collect();
        let computed_at = Utc::now();

        Ok(queries
            .iter()
            .enumerate()
            .map(|(i, query)| {
                let mut rows: Vec<ScoreRow> = candidates
                    .iter()
                    .enumerate()
                    .map(|(j, candidate)| {
                        let scores: Vec<f64> = std::iter::once(seek_rows[i][j])
                            .chain(embedding_matrices.iter().map(|m| m[[i, j]]))
                            .collect();
                        ScoreRow {
                            rank: None,
                            individual: candidate.id,
                            name: candidate.name.clone(),
                            combined: combine_channels(&scores, &weights),
                            scores,
                            seek_code: codes[j],
                        }
                    })
                    .collect();
                rank_rows(&mut rows);
                ScoringResult {
                    sighting: query.id,
                    computed_at,
                    channels: channels.clone(),
                    rows,
                }
            })
            .collect())
    }
}
