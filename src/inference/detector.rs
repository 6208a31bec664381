//! Detector capability and raw output conversion.

use super::DetectorKind;
use crate::error::Result;
use crate::geometry::BBox;
use crate::store::NewDetection;
use image::DynamicImage;
use tracing::warn;

/// One detector output row in normalized center-size format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Box center x.
    pub x_center: f32,
    /// Box center y.
    pub y_center: f32,
    /// Box width.
    pub w: f32,
    /// Box height.
    pub h: f32,
    /// Detector confidence.
    pub confidence: f32,
    /// Detector output class index.
    pub class_id: u32,
}

impl RawDetection {
    /// Box in corner format.
    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.x_center, self.y_center, self.w, self.h)
    }
}

/// A batch detector for one detector family.
pub trait Detector: Send + Sync {
    /// Detector family; selects the vocabulary and the per-photo completion flag.
    fn kind(&self) -> DetectorKind;

    /// Run one inference call over a batch, returning rows per input image.
    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<RawDetection>>>;
}

/// Map raw rows through the detector's vocabulary.
///
/// Rows whose class index the vocabulary does not name are dropped.
pub fn label_detections(kind: DetectorKind, rows: &[RawDetection]) -> Vec<NewDetection> {
    let map = kind.class_map();
    rows.iter()
        .filter_map(|row| match map.lookup(row.class_id) {
            Some(class) => Some(NewDetection {
                class,
                bbox: row.bbox(),
                confidence: row.confidence,
            }),
            None => {
                if row.class_id as usize >= map.cardinality() {
                    warn!(
                        "{kind} detector returned class {} outside its {}-class vocabulary",
                        row.class_id,
                        map.cardinality()
                    );
                }
                None
            }
        })
        .collect()
}
