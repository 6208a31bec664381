//! Photo processing stages: detection, association and embedding extraction.
//!
//! Each stage is safe to re-run. Detection writes its completion flag and its
//! detections in one store call, extraction replaces embeddings per
//! (detection, class), and association rewrites one photo's links at a time.

mod associate;
mod detect;
mod extract;

pub use associate::{AssociationThresholds, associate};
pub use detect::DetectSummary;
pub use extract::ExtractSummary;

use crate::constants::DEFAULT_BATCH_SIZE;
use crate::error::Result;
use crate::inference::{Detector, FeatureExtractor};
use crate::jobs::{Job, JobSink};
use crate::scoring::{Combiner, ScoringSettings};
use crate::store::Store;
use std::sync::Arc;
use tracing::warn;

/// Tunables shared by the stages.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Photos per detector inference call.
    pub batch_size: usize,
    /// Association overlap thresholds.
    pub thresholds: AssociationThresholds,
    /// Channel weights and SEEK penalty.
    pub scoring: ScoringSettings,
    /// Show progress bars.
    pub progress: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            thresholds: AssociationThresholds::default(),
            scoring: ScoringSettings::default(),
            progress: false,
        }
    }
}

/// Stage driver over a store and an ordered set of detectors and extractors.
pub struct Pipeline {
    store: Arc<dyn Store>,
    detectors: Vec<Arc<dyn Detector>>,
    extractors: Vec<Arc<dyn FeatureExtractor>>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Pipeline with no detectors or extractors.
    ///
    /// A zero batch size is raised to one.
    pub fn new(store: Arc<dyn Store>, mut settings: PipelineSettings) -> Self {
        if settings.batch_size == 0 {
            warn!("Batch size 0 is not usable, detecting one photo at a time");
            settings.batch_size = 1;
        }
        Self {
            store,
            detectors: Vec::new(),
            extractors: Vec::new(),
            settings,
        }
    }

    /// Append a detector; detectors run in the order added.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Append a feature extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Stage settings in effect.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Score combiner over this pipeline's store.
    pub fn combiner(&self) -> Combiner {
        Combiner::new(Arc::clone(&self.store), self.settings.scoring.clone())
    }

    /// Run one job, dispatching any follow-up jobs to `sink`.
    pub fn execute(&self, job: &Job, sink: &dyn JobSink) -> Result<()> {
        match job {
            Job::Detect { photos, force } => self.detect(photos, *force, sink).map(drop),
            Job::Extract {
                detections,
                class,
                force,
            } => self.extract(detections, *class, *force).map(drop),
            Job::Associate { photos } => self.associate(photos).map(drop),
            Job::Score { mode } => self.combiner().run(mode).map(drop),
        }
    }
}
