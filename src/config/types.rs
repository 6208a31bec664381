//! Configuration type definitions.

use crate::constants::association::{PART_CONTAINMENT_THRESHOLD, SUBJECT_IOU_THRESHOLD};
use crate::constants::models::{
    DEFAULT_MIN_CONFIDENCE, DETECTOR_INPUT_SIZE, EMBEDDING_INPUT_SIZE,
};
use crate::constants::scoring::{LEFT_EAR_WEIGHT, RIGHT_EAR_WEIGHT, SEEK_WEIGHT, WILDCARD_PENALTY};
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::inference::DetectorKind;
use crate::pipeline::{AssociationThresholds, PipelineSettings};
use crate::scoring::ScoringSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store snapshot location.
    pub store: StoreConfig,

    /// Detection batching.
    pub pipeline: PipelineConfig,

    /// Association thresholds.
    pub association: AssociationConfig,

    /// Score combination.
    pub scoring: ScoringConfig,

    /// Model files.
    pub models: ModelsConfig,

    /// Job worker behavior.
    pub worker: WorkerConfig,
}

impl Config {
    /// Pipeline settings derived from this configuration.
    pub fn pipeline_settings(&self, progress: bool) -> PipelineSettings {
        PipelineSettings {
            batch_size: self.pipeline.batch_size,
            thresholds: AssociationThresholds {
                subject_iou: self.association.subject_iou_threshold,
                part_containment: self.association.part_containment_threshold,
            },
            scoring: ScoringSettings {
                seek_weight: self.scoring.seek_weight,
                right_ear_weight: self.scoring.right_ear_weight,
                left_ear_weight: self.scoring.left_ear_weight,
                wildcard_penalty: self.scoring.wildcard_penalty,
            },
            progress,
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot path; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

/// Detection batching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Photos per detector inference call.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Association thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Minimum IoU for whole-animal detections.
    pub subject_iou_threshold: f32,
    /// Containment ratio ear detections must exceed.
    pub part_containment_threshold: f32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            subject_iou_threshold: SUBJECT_IOU_THRESHOLD,
            part_containment_threshold: PART_CONTAINMENT_THRESHOLD,
        }
    }
}

/// Score combination weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// SEEK channel weight.
    pub seek_weight: f64,
    /// Right-ear embedding channel weight.
    pub right_ear_weight: f64,
    /// Left-ear embedding channel weight.
    pub left_ear_weight: f64,
    /// SEEK penalty per unit of candidate wildcard fraction.
    pub wildcard_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            seek_weight: SEEK_WEIGHT,
            right_ear_weight: RIGHT_EAR_WEIGHT,
            left_ear_weight: LEFT_EAR_WEIGHT,
            wildcard_penalty: WILDCARD_PENALTY,
        }
    }
}

/// Model files for every backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// General object detector.
    pub object: DetectorModelConfig,
    /// Ear detector.
    pub ear: DetectorModelConfig,
    /// Ear embedding network.
    pub embedding: EmbeddingModelConfig,
}

impl ModelsConfig {
    /// Detector settings for a family.
    pub const fn detector(&self, kind: DetectorKind) -> &DetectorModelConfig {
        match kind {
            DetectorKind::Object => &self.object,
            DetectorKind::Ear => &self.ear,
        }
    }
}

/// One ONNX detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorModelConfig {
    /// Path to the ONNX model; the detector is disabled when unset.
    pub path: Option<PathBuf>,
    /// Square input edge in pixels.
    pub input_size: u32,
    /// Rows below this confidence are discarded.
    pub min_confidence: f32,
    /// Number of output classes the model was trained on; checked against
    /// the family's vocabulary when set.
    pub num_classes: Option<usize>,
}

impl DetectorModelConfig {
    /// Class count to validate against, falling back to the vocabulary size.
    pub fn class_count(&self, kind: DetectorKind) -> usize {
        self.num_classes
            .unwrap_or_else(|| kind.class_map().cardinality())
    }
}

impl Default for DetectorModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_size: DETECTOR_INPUT_SIZE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            num_classes: None,
        }
    }
}

/// The ONNX embedding network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingModelConfig {
    /// Path to the ONNX model; extraction is disabled when unset.
    pub path: Option<PathBuf>,
    /// Square input edge in pixels.
    pub input_size: u32,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_size: EMBEDDING_INPUT_SIZE,
        }
    }
}

/// Job worker settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Extra attempts for a failed job.
    pub redeliveries: u32,
}

/// Formats for rendering score tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Comma-separated values.
    Csv,
    /// JSON array of row objects.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
