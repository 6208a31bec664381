//! Embedding capability, feature extractors and crop handling.

use super::{DetectionClass, EarSide, EmbeddingClass};
use crate::error::{Error, Result};
use crate::store::{Detection, DetectionId};
use image::DynamicImage;
use std::sync::Arc;

/// Turns one image crop into a raw feature vector.
pub trait EmbeddingModel: Send + Sync {
    /// Run inference on a single crop.
    fn embed(&self, crop: &DynamicImage) -> Result<Vec<f32>>;
}

/// An embedding strategy: which detections it applies to and how to embed them.
pub trait FeatureExtractor: Send + Sync {
    /// Embedding class tag written with every vector.
    fn class(&self) -> EmbeddingClass;

    /// Whether `detection` qualifies for this extractor.
    fn is_eligible(&self, detection: &Detection) -> bool;

    /// Raw feature vector for a crop of an eligible detection.
    fn extract(&self, crop: &DynamicImage) -> Result<Vec<f32>>;
}

/// Ear extractor. Both sides share one model; the left side mirrors its
/// crops so the model always sees a right-ear orientation.
pub struct EarExtractor {
    side: EarSide,
    model: Arc<dyn EmbeddingModel>,
}

impl EarExtractor {
    /// Right-ear extractor.
    pub fn right(model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            side: EarSide::Right,
            model,
        }
    }

    /// Left-ear extractor; crops are flipped horizontally before inference.
    pub fn left(model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            side: EarSide::Left,
            model,
        }
    }
}

impl FeatureExtractor for EarExtractor {
    fn class(&self) -> EmbeddingClass {
        match self.side {
            EarSide::Right => EmbeddingClass::RightEar,
            EarSide::Left => EmbeddingClass::LeftEar,
        }
    }

    fn is_eligible(&self, detection: &Detection) -> bool {
        detection.class == DetectionClass::Ear { side: self.side }
    }

    fn extract(&self, crop: &DynamicImage) -> Result<Vec<f32>> {
        match self.side {
            EarSide::Right => self.model.embed(crop),
            EarSide::Left => self.model.embed(&crop.fliph()),
        }
    }
}

/// Cut a detection's region out of its source image.
pub fn crop_detection(image: &DynamicImage, detection: &Detection) -> Result<DynamicImage> {
    let (x, y, w, h) = detection
        .bbox
        .to_pixel_rect(image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(Error::EmptyCrop { id: detection.id });
    }
    Ok(image.crop_imm(x, y, w, h))
}

/// Center a vector on zero and scale it to unit L2 norm.
pub fn normalize_embedding(id: DetectionId, mut vector: Vec<f32>) -> Result<Vec<f32>> {
    if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::DegenerateEmbedding { id });
    }
    let mean = vector.iter().sum::<f32>() / vector.len() as f32;
    for v in &mut vector {
        *v -= mean;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return Err(Error::DegenerateEmbedding { id });
    }
    for v in &mut vector {
        *v /= norm;
    }
    Ok(vector)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::store::PhotoId;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    /// Records the leftmost pixel of every crop it sees.
    struct ProbeModel {
        seen: Mutex<Vec<u8>>,
    }

    impl EmbeddingModel for ProbeModel {
        fn embed(&self, crop: &DynamicImage) -> Result<Vec<f32>> {
            let px = crop.to_rgb8().get_pixel(0, 0)[0];
            self.seen.lock().unwrap().push(px);
            Ok(vec![f32::from(px), 0.0])
        }
    }

    fn ear(side: EarSide) -> Detection {
        Detection {
            id: DetectionId(9),
            photo: PhotoId(1),
            class: DetectionClass::Ear { side },
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            confidence: 0.9,
            ground_truth: None,
        }
    }

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(4, 2, |x, _| Rgb([x as u8 * 10, 0, 0])))
    }

    #[test]
    fn test_left_extractor_mirrors_crop() {
        let model = Arc::new(ProbeModel {
            seen: Mutex::new(Vec::new()),
        });
        let right = EarExtractor::right(model.clone());
        let left = EarExtractor::left(model.clone());

        right.extract(&gradient()).unwrap();
        left.extract(&gradient()).unwrap();
        assert_eq!(*model.seen.lock().unwrap(), vec![0, 30]);
    }

    #[test]
    fn test_eligibility_follows_side() {
        let model = Arc::new(ProbeModel {
            seen: Mutex::new(Vec::new()),
        });
        let right = EarExtractor::right(model);
        assert!(right.is_eligible(&ear(EarSide::Right)));
        assert!(!right.is_eligible(&ear(EarSide::Left)));
        assert_eq!(right.class(), EmbeddingClass::RightEar);
    }

    #[test]
    fn test_crop_uses_pixel_rect() {
        let mut det = ear(EarSide::Right);
        det.bbox = BBox::new(0.5, 0.0, 1.0, 1.0);
        let crop = crop_detection(&gradient(), &det).unwrap();
        assert_eq!((crop.width(), crop.height()), (2, 2));
        assert_eq!(crop.to_rgb8().get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn test_empty_crop_is_error() {
        let mut det = ear(EarSide::Right);
        det.bbox = BBox::new(0.5, 0.5, 0.5, 0.9);
        assert!(matches!(
            crop_detection(&gradient(), &det),
            Err(Error::EmptyCrop { .. })
        ));
    }

    #[test]
    fn test_normalize_zero_mean_unit_norm() {
        let v = normalize_embedding(DetectionId(1), vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        let mean: f32 = v.iter().sum::<f32>() / 4.0;
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(mean.abs() < 1e-6);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_rejects_constant_vector() {
        assert!(matches!(
            normalize_embedding(DetectionId(3), vec![2.0; 8]),
            Err(Error::DegenerateEmbedding { .. })
        ));
        assert!(normalize_embedding(DetectionId(3), Vec::new()).is_err());
    }
}
