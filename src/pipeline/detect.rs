//! Batched detection over photos.

use super::Pipeline;
use crate::error::Result;
use crate::inference::{Detector, DetectorKind, label_detections};
use crate::jobs::{Job, JobSink};
use crate::output::progress;
use crate::store::{Detection, DetectorStatus, PhotoId};
use image::DynamicImage;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Counts from one detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectSummary {
    /// Photos at least one detector ran on.
    pub photos: usize,
    /// Detections written.
    pub detections: usize,
    /// (photo, detector) pairs skipped because the detector had already run.
    pub skipped: usize,
    /// Photos whose image could not be loaded.
    pub unreadable: usize,
}

impl Pipeline {
    /// Run every detector over the photos that still need it.
    ///
    /// Each detector is invoked once per batch. A photo's detections for a
    /// detector family are replaced together with its completion flag, then
    /// extraction and association are dispatched for what was written.
    pub fn detect(
        &self,
        photos: &[PhotoId],
        force: bool,
        sink: &dyn JobSink,
    ) -> Result<DetectSummary> {
        let mut summary = DetectSummary::default();
        let mut processed = BTreeSet::new();
        let mut written: Vec<Detection> = Vec::new();

        for detector in &self.detectors {
            let kind = detector.kind();
            let mut pending = Vec::new();
            for &photo in photos {
                let status = self.store.ml_record(photo)?.status(kind);
                if force || status == DetectorStatus::Unattempted {
                    pending.push(photo);
                } else {
                    debug!("Photo {photo}: {kind} detector already run, skipping");
                    summary.skipped += 1;
                }
            }
            if pending.is_empty() {
                continue;
            }

            info!(
                "Running {kind} detector on {} photos (batch size {})",
                pending.len(),
                self.settings.batch_size
            );
            let pb = progress::create_batch_progress(
                pending.len(),
                &format!("{kind} detection"),
                self.settings.progress,
            );

            for batch in pending.chunks(self.settings.batch_size) {
                let (ids, images) = self.load_batch(batch, &mut summary);
                if !ids.is_empty() {
                    let stored = self.detect_batch(detector.as_ref(), &ids, &images)?;
                    summary.detections += stored.len();
                    processed.extend(ids.iter().copied());
                    written.extend(stored);
                }
                progress::inc_progress(pb.as_ref(), batch.len() as u64);
            }
            progress::finish_progress(pb, &format!("{kind} detection complete"));
        }

        summary.photos = processed.len();
        self.dispatch_followups(&processed, &written, sink)?;
        Ok(summary)
    }

    fn load_batch(
        &self,
        batch: &[PhotoId],
        summary: &mut DetectSummary,
    ) -> (Vec<PhotoId>, Vec<DynamicImage>) {
        let mut ids = Vec::with_capacity(batch.len());
        let mut images = Vec::with_capacity(batch.len());
        for &id in batch {
            match self
                .store
                .photo(id)
                .and_then(|photo| self.store.load_image(&photo))
            {
                Ok(image) => {
                    ids.push(id);
                    images.push(image);
                }
                Err(e) => {
                    warn!("Skipping photo {id}: {e}");
                    summary.unreadable += 1;
                }
            }
        }
        (ids, images)
    }

    fn detect_batch(
        &self,
        detector: &dyn Detector,
        ids: &[PhotoId],
        images: &[DynamicImage],
    ) -> Result<Vec<Detection>> {
        let kind = detector.kind();
        let results = detector.detect(images).inspect_err(|e| {
            error!("{kind} detector failed on photos {}: {e}", format_ids(ids));
        })?;
        if results.len() != ids.len() {
            error!(
                "{kind} detector returned {} results for photos {}",
                results.len(),
                format_ids(ids)
            );
            return Err(crate::error::Error::Inference {
                reason: format!(
                    "{kind} detector returned {} results for {} images",
                    results.len(),
                    ids.len()
                ),
            });
        }

        let mut stored = Vec::new();
        for (&photo, rows) in ids.iter().zip(&results) {
            let labeled = label_detections(kind, rows);
            stored.extend(self.store.replace_detections(photo, kind, labeled)?);
        }
        Ok(stored)
    }

    fn dispatch_followups(
        &self,
        photos: &BTreeSet<PhotoId>,
        written: &[Detection],
        sink: &dyn JobSink,
    ) -> Result<()> {
        if photos.is_empty() {
            return Ok(());
        }
        for extractor in &self.extractors {
            let detections: Vec<_> = written
                .iter()
                .filter(|d| extractor.is_eligible(d))
                .map(|d| d.id)
                .collect();
            if !detections.is_empty() {
                sink.dispatch(Job::Extract {
                    detections,
                    class: extractor.class(),
                    force: false,
                })?;
            }
        }
        sink.dispatch(Job::Associate {
            photos: photos.iter().copied().collect(),
        })
    }

    /// Detector families configured on this pipeline, in run order.
    pub fn detector_kinds(&self) -> Vec<DetectorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }
}

fn format_ids(ids: &[PhotoId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
