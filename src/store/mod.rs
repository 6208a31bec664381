//! Repository contracts and the in-memory store.
//!
//! Pipeline stages only talk to the store through these traits. Every
//! mutation that the pipeline relies on for idempotency is a single call so
//! that an implementation can make it atomic:
//!
//! - [`DetectionRepository::replace_detections`] writes a detector's
//!   completion flag together with its detections (and drops embeddings of
//!   the replaced detections).
//! - [`EmbeddingRepository::replace_embedding`] deletes then inserts.
//! - [`DetectionRepository::set_associations`] rewrites one photo's links.
//! - [`ScoreCache::put_scoring_result`] overwrites a sighting's cache whole.
//!
//! Concurrent writers are last-write-wins.

mod memory;
mod types;

pub use memory::MemoryStore;
pub use types::{
    BoxSubject, Channel, Detection, DetectionId, DetectorStatus, Embedding, EmbeddingId,
    GroundTruthBox, GroundTruthId, Individual, IndividualId, MlRecord, NewDetection, Photo,
    PhotoId, ScoreRow, ScoringResult, Sighting, SightingId, nan_as_null,
};

use crate::error::{Error, Result};
use crate::inference::{DetectorKind, EmbeddingClass};
use crate::seek::TraitCode;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::path::Path;

/// Photos and their pixel data.
pub trait PhotoRepository {
    /// Look up one photo.
    fn photo(&self, id: PhotoId) -> Result<Photo>;

    /// All photo ids in ascending order.
    fn photo_ids(&self) -> Result<Vec<PhotoId>>;

    /// Look up a photo by its unique name.
    fn photo_by_name(&self, name: &str) -> Result<Option<Photo>>;

    /// Register a photo; names are unique.
    fn add_photo(&self, name: &str, path: &Path, width: u32, height: u32) -> Result<Photo>;

    /// Decode a photo's image.
    fn load_image(&self, photo: &Photo) -> Result<DynamicImage> {
        image::open(&photo.path).map_err(|e| Error::ImageOpen {
            path: photo.path.clone(),
            source: e,
        })
    }
}

/// Human-drawn boxes. All queries return boxes in ascending id order.
pub trait GroundTruthRepository {
    /// Boxes drawn on one photo.
    fn boxes_for_photo(&self, photo: PhotoId) -> Result<Vec<GroundTruthBox>>;

    /// Boxes attached to any of the given sightings.
    fn boxes_for_sightings(&self, sightings: &[SightingId]) -> Result<Vec<GroundTruthBox>>;

    /// Boxes attached to any sighting of an individual.
    fn boxes_for_individual(&self, individual: IndividualId) -> Result<Vec<GroundTruthBox>>;

    /// Record a box in normalized `x, y, w, h` coordinates.
    fn add_ground_truth(
        &self,
        photo: PhotoId,
        xywh: [f32; 4],
        subject: BoxSubject,
    ) -> Result<GroundTruthBox>;
}

/// Identities and sightings.
pub trait SightingRepository {
    /// All individuals in ascending id order.
    fn individuals(&self) -> Result<Vec<Individual>>;

    /// Individuals that have at least one sighting, in ascending id order.
    fn sighted_individuals(&self) -> Result<Vec<Individual>>;

    /// Look up an individual by its unique name.
    fn individual_by_name(&self, name: &str) -> Result<Option<Individual>>;

    /// Register an individual; names are unique.
    fn add_individual(&self, name: &str) -> Result<Individual>;

    /// Look up one sighting.
    fn sighting(&self, id: SightingId) -> Result<Sighting>;

    /// All sightings in ascending id order.
    fn sightings(&self) -> Result<Vec<Sighting>>;

    /// Record a sighting.
    fn add_sighting(
        &self,
        individual: Option<IndividualId>,
        observed_at: DateTime<Utc>,
        seek: TraitCode,
    ) -> Result<Sighting>;

    /// Replace a sighting's trait code. Cached scoring results are not invalidated.
    fn set_trait_code(&self, id: SightingId, seek: TraitCode) -> Result<()>;

    /// Trait code of the individual's most recent sighting (latest time, then highest id).
    fn latest_trait_code(&self, individual: IndividualId) -> Result<Option<TraitCode>>;
}

/// Detections and per-photo detector bookkeeping.
pub trait DetectionRepository {
    /// Inference record for a photo; empty if no detector has run.
    fn ml_record(&self, photo: PhotoId) -> Result<MlRecord>;

    /// Replace every detection of `detector` on `photo` and mark the detector as run.
    ///
    /// The flag, the deletion and the insertion land in one write.
    fn replace_detections(
        &self,
        photo: PhotoId,
        detector: DetectorKind,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>>;

    /// All detections on a photo in ascending id order.
    fn detections_for_photo(&self, photo: PhotoId) -> Result<Vec<Detection>>;

    /// Detections by id; ids that no longer exist are skipped.
    fn detections(&self, ids: &[DetectionId]) -> Result<Vec<Detection>>;

    /// Every detection id in ascending order.
    fn detection_ids(&self) -> Result<Vec<DetectionId>>;

    /// Set or clear the ground-truth link of detections on one photo.
    fn set_associations(
        &self,
        photo: PhotoId,
        links: &[(DetectionId, Option<GroundTruthId>)],
    ) -> Result<()>;

    /// Detections linked to any of the given ground-truth boxes.
    fn detections_for_ground_truth(&self, boxes: &[GroundTruthId]) -> Result<Vec<Detection>>;
}

/// Feature vectors keyed by (detection, class).
pub trait EmbeddingRepository {
    /// The embedding of `class` owned by `detection`, if any.
    fn embedding(&self, detection: DetectionId, class: EmbeddingClass)
    -> Result<Option<Embedding>>;

    /// Delete any embedding of `class` for `detection`, then insert `vector`.
    fn replace_embedding(
        &self,
        detection: DetectionId,
        class: EmbeddingClass,
        vector: Vec<f32>,
    ) -> Result<Embedding>;

    /// Embeddings of `class` owned by any of the given detections.
    fn embeddings_for_detections(
        &self,
        detections: &[DetectionId],
        class: EmbeddingClass,
    ) -> Result<Vec<Embedding>>;
}

/// Cached scoring results, one per query sighting.
pub trait ScoreCache {
    /// Cached result for a sighting.
    fn scoring_result(&self, sighting: SightingId) -> Result<Option<ScoringResult>>;

    /// Overwrite a sighting's cached result.
    fn put_scoring_result(&self, result: ScoringResult) -> Result<()>;

    /// Whether a cached result exists.
    fn has_scoring_result(&self, sighting: SightingId) -> Result<bool> {
        Ok(self.scoring_result(sighting)?.is_some())
    }
}

/// Everything the pipeline needs from persistence.
pub trait Store:
    PhotoRepository
    + GroundTruthRepository
    + SightingRepository
    + DetectionRepository
    + EmbeddingRepository
    + ScoreCache
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: PhotoRepository
        + GroundTruthRepository
        + SightingRepository
        + DetectionRepository
        + EmbeddingRepository
        + ScoreCache
        + Send
        + Sync
{
}
