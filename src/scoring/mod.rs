//! Re-identification scoring: embedding aggregation, channel combination and search.

mod combine;
mod embedding;
mod search;

pub use combine::{Combiner, ScoreMode, ScoringSettings, combine_channels, rank_rows};
pub use embedding::{EmbeddingGroup, embedding_scores, individual_embeddings, sighting_embeddings};
pub use search::{SearchHit, search_code};
