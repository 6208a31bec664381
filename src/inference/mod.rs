//! Detection and embedding backends.
//!
//! Pipeline stages depend only on the [`Detector`], [`EmbeddingModel`] and
//! [`FeatureExtractor`] traits; [`onnx`] provides the ONNX Runtime versions.

mod classes;
mod detector;
mod extractor;
pub mod onnx;

pub use classes::{
    ClassMap, DetectionClass, DetectorKind, EAR_CLASSES, EarSide, EmbeddingClass, OBJECT_CLASSES,
    Vocabulary,
};
pub use detector::{Detector, RawDetection, label_detections};
pub use extractor::{
    EarExtractor, EmbeddingModel, FeatureExtractor, crop_detection, normalize_embedding,
};
pub use onnx::{OnnxDetector, OnnxEmbedder};
