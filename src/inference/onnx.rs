//! ONNX Runtime backends for detection and embedding.

use super::{Detector, DetectorKind, EmbeddingModel, RawDetection};
use crate::config::{DetectorModelConfig, EmbeddingModelConfig};
use crate::constants::models::DETECTION_ROW_LEN;
use crate::error::{Error, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(Error::ModelFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let model_err = |reason: String| Error::ModelLoad {
        path: path.to_path_buf(),
        reason,
    };
    Session::builder()
        .map_err(|e| model_err(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| model_err(e.to_string()))
}

fn inference_err(e: impl std::fmt::Display) -> Error {
    Error::Inference {
        reason: e.to_string(),
    }
}

/// Resize to a square input and append RGB planes scaled to [0, 1].
fn push_nchw(image: &DynamicImage, size: u32, out: &mut Vec<f32>) {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let plane = size as usize * size as usize;
    let start = out.len();
    out.resize(start + 3 * plane, 0.0);
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            out[start + c * plane + i] = f32::from(pixel[c]) / 255.0;
        }
    }
}

/// Post-NMS detector emitting `[batch, rows, 6]` of
/// `(x_center, y_center, w, h, confidence, class_id)`.
pub struct OnnxDetector {
    kind: DetectorKind,
    session: Mutex<Session>,
    input_size: u32,
    min_confidence: f32,
}

impl OnnxDetector {
    /// Load a detector and check its class count against the family's vocabulary.
    pub fn from_config(kind: DetectorKind, config: &DetectorModelConfig) -> Result<Self> {
        let path = config
            .path
            .as_deref()
            .ok_or_else(|| Error::ConfigValidation {
                message: format!("no model configured for the {kind} detector"),
            })?;
        kind.class_map().validate(config.class_count(kind))?;
        let session = load_session(path)?;

        info!(
            "Loaded {kind} detector: {} ({}px, min confidence {})",
            path.display(),
            config.input_size,
            config.min_confidence
        );

        Ok(Self {
            kind,
            session: Mutex::new(session),
            input_size: config.input_size,
            min_confidence: config.min_confidence,
        })
    }

    fn parse_rows(&self, shape: &[i64], data: &[f32]) -> Result<Vec<Vec<RawDetection>>> {
        let [batch, rows, width] = shape else {
            return Err(inference_err(format!(
                "expected detector output [batch, rows, {DETECTION_ROW_LEN}], got {shape:?}"
            )));
        };
        let (batch, rows, width) = (
            usize::try_from(*batch).map_err(inference_err)?,
            usize::try_from(*rows).map_err(inference_err)?,
            usize::try_from(*width).map_err(inference_err)?,
        );
        if width != DETECTION_ROW_LEN || data.len() != batch * rows * width {
            return Err(inference_err(format!(
                "detector output shape {shape:?} does not match {} values",
                data.len()
            )));
        }

        Ok(data
            .chunks_exact(rows * width)
            .map(|image_rows| {
                image_rows
                    .chunks_exact(width)
                    .filter(|r| r[4] > 0.0 && r[4] >= self.min_confidence)
                    .map(|r| RawDetection {
                        x_center: r[0],
                        y_center: r[1],
                        w: r[2],
                        h: r[3],
                        confidence: r[4],
                        class_id: r[5].round().max(0.0) as u32,
                    })
                    .collect()
            })
            .collect())
    }
}

impl Detector for OnnxDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<RawDetection>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let size = self.input_size;
        let mut input = Vec::with_capacity(images.len() * 3 * size as usize * size as usize);
        for image in images {
            push_nchw(image, size, &mut input);
        }
        let tensor = Tensor::from_array(([images.len(), 3, size as usize, size as usize], input))
            .map_err(inference_err)?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: format!("{} detector session lock poisoned", self.kind),
        })?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(inference_err)?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;

        let detections = self.parse_rows(shape, data)?;
        if detections.len() != images.len() {
            return Err(inference_err(format!(
                "{} detector returned {} results for {} images",
                self.kind,
                detections.len(),
                images.len()
            )));
        }
        debug!(
            "{} detector: {} images, {} rows kept",
            self.kind,
            images.len(),
            detections.iter().map(Vec::len).sum::<usize>()
        );
        Ok(detections)
    }
}

/// Embedding network producing one flat vector per crop.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    input_size: u32,
}

impl OnnxEmbedder {
    /// Load the embedding model.
    pub fn from_config(config: &EmbeddingModelConfig) -> Result<Self> {
        let path = config
            .path
            .as_deref()
            .ok_or_else(|| Error::ConfigValidation {
                message: "no embedding model configured".to_string(),
            })?;
        let session = load_session(path)?;
        info!(
            "Loaded embedding model: {} ({}px)",
            path.display(),
            config.input_size
        );
        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
        })
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn embed(&self, crop: &DynamicImage) -> Result<Vec<f32>> {
        let size = self.input_size;
        let mut input = Vec::with_capacity(3 * size as usize * size as usize);
        push_nchw(crop, size, &mut input);
        let tensor = Tensor::from_array(([1, 3, size as usize, size as usize], input))
            .map_err(inference_err)?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "embedding session lock poisoned".to_string(),
        })?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(inference_err)?;
        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_push_nchw_planes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 51])));
        let mut out = Vec::new();
        push_nchw(&img, 2, &mut out);
        assert_eq!(out.len(), 12);
        assert!(out[..4].iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert!(out[4..8].iter().all(|v| v.abs() < 1e-6));
        assert!(out[8..].iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_missing_model_file() {
        let config = EmbeddingModelConfig {
            path: Some("/nonexistent/embedder.onnx".into()),
            input_size: 224,
        };
        assert!(matches!(
            OnnxEmbedder::from_config(&config),
            Err(Error::ModelFileNotFound { .. })
        ));
    }

    #[test]
    fn test_class_count_checked_before_loading() {
        let config = DetectorModelConfig {
            path: Some("/nonexistent/ears.onnx".into()),
            input_size: 640,
            min_confidence: 0.25,
            num_classes: Some(2),
        };
        assert!(matches!(
            OnnxDetector::from_config(DetectorKind::Ear, &config),
            Err(Error::ClassMapMismatch { .. })
        ));
    }
}
