//! Embedding extraction for eligible detections.

use super::Pipeline;
use crate::error::{Error, Result};
use crate::inference::{EmbeddingClass, FeatureExtractor, crop_detection, normalize_embedding};
use crate::store::{Detection, DetectionId, PhotoId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Counts from one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Embeddings written.
    pub written: usize,
    /// Detections that already had an embedding of the class.
    pub existing: usize,
    /// Detections that were missing, ineligible, or could not be cropped or normalized.
    pub skipped: usize,
}

impl Pipeline {
    /// Extractor registered for an embedding class.
    pub fn extractor(&self, class: EmbeddingClass) -> Result<&Arc<dyn FeatureExtractor>> {
        self.extractors
            .iter()
            .find(|e| e.class() == class)
            .ok_or(Error::ExtractorNotFound { class })
    }

    /// Embedding classes with a registered extractor, in registration order.
    pub fn embedding_classes(&self) -> Vec<EmbeddingClass> {
        self.extractors.iter().map(|e| e.class()).collect()
    }

    /// Embed each eligible detection, replacing any previous vector of the same class.
    ///
    /// Without `force`, detections that already own an embedding of `class`
    /// are left alone.
    pub fn extract(
        &self,
        ids: &[DetectionId],
        class: EmbeddingClass,
        force: bool,
    ) -> Result<ExtractSummary> {
        let extractor = self.extractor(class)?;
        let mut summary = ExtractSummary::default();

        let detections = self.store.detections(ids)?;
        summary.skipped += ids.len() - detections.len();

        let mut by_photo: BTreeMap<PhotoId, Vec<Detection>> = BTreeMap::new();
        for detection in detections {
            if !extractor.is_eligible(&detection) {
                summary.skipped += 1;
                continue;
            }
            if !force && self.store.embedding(detection.id, class)?.is_some() {
                summary.existing += 1;
                continue;
            }
            by_photo.entry(detection.photo).or_default().push(detection);
        }

        for (photo_id, detections) in by_photo {
            let image = match self
                .store
                .photo(photo_id)
                .and_then(|photo| self.store.load_image(&photo))
            {
                Ok(image) => image,
                Err(e) => {
                    warn!("Skipping {class} extraction on photo {photo_id}: {e}");
                    summary.skipped += detections.len();
                    continue;
                }
            };

            for detection in detections {
                let crop = match crop_detection(&image, &detection) {
                    Ok(crop) => crop,
                    Err(e) => {
                        warn!("Detection {} on photo {photo_id}: {e}", detection.id);
                        summary.skipped += 1;
                        continue;
                    }
                };
                let raw = extractor.extract(&crop).inspect_err(|e| {
                    error!(
                        "{class} extraction failed for detection {} on photo {photo_id}: {e}",
                        detection.id
                    );
                })?;
                let vector = match normalize_embedding(detection.id, raw) {
                    Ok(vector) => vector,
                    Err(e) => {
                        warn!("{e}");
                        summary.skipped += 1;
                        continue;
                    }
                };
                self.store.replace_embedding(detection.id, class, vector)?;
                summary.written += 1;
            }
        }

        debug!("{class} extraction: {summary:?}");
        if summary.written > 0 {
            info!("Wrote {} {class} embeddings", summary.written);
        }
        Ok(summary)
    }
}
