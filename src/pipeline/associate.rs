//! Geometric matching of detections to ground-truth boxes.
//!
//! Matching is first-match: ground-truth boxes are scanned in ascending id
//! order and the first box that clears the class's threshold wins, even if a
//! later box overlaps more.

use super::Pipeline;
use crate::constants::association::{PART_CONTAINMENT_THRESHOLD, SUBJECT_IOU_THRESHOLD};
use crate::error::Result;
use crate::geometry::{containment_ratio, iou};
use crate::inference::Vocabulary;
use crate::store::{Detection, DetectionId, GroundTruthBox, GroundTruthId, PhotoId};
use tracing::{debug, error};

/// Overlap thresholds used by association.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociationThresholds {
    /// Minimum IoU (inclusive) for whole-subject classes.
    pub subject_iou: f32,
    /// Minimum containment ratio (exclusive) for anatomical-part classes.
    pub part_containment: f32,
}

impl Default for AssociationThresholds {
    fn default() -> Self {
        Self {
            subject_iou: SUBJECT_IOU_THRESHOLD,
            part_containment: PART_CONTAINMENT_THRESHOLD,
        }
    }
}

/// Ground-truth link for every detection, in detection order.
///
/// `boxes` must be in persisted id order. Detections whose class is never
/// matched get `None`, which clears any earlier link.
pub fn associate(
    detections: &[Detection],
    boxes: &[GroundTruthBox],
    thresholds: AssociationThresholds,
) -> Vec<(DetectionId, Option<GroundTruthId>)> {
    detections
        .iter()
        .map(|detection| {
            let bbox = detection.bbox;
            let matched = match detection.class.vocabulary() {
                Vocabulary::WholeSubject => boxes
                    .iter()
                    .find(|gt| iou(&bbox, &gt.bbox()) >= thresholds.subject_iou),
                Vocabulary::AnatomicalPart => boxes
                    .iter()
                    .find(|gt| containment_ratio(&bbox, &gt.bbox()) > thresholds.part_containment),
                Vocabulary::Unmatched => None,
            };
            (detection.id, matched.map(|gt| gt.id))
        })
        .collect()
}

impl Pipeline {
    /// Re-associate every detection on each photo with that photo's ground-truth boxes.
    ///
    /// Returns the number of detections that ended up linked.
    pub fn associate(&self, photos: &[PhotoId]) -> Result<usize> {
        let mut linked = 0;
        for &photo in photos {
            let detections = self.store.detections_for_photo(photo)?;
            let boxes = self.store.boxes_for_photo(photo)?;
            let links = associate(&detections, &boxes, self.settings.thresholds);
            let count = links.iter().filter(|(_, gt)| gt.is_some()).count();

            if let Err(e) = self.store.set_associations(photo, &links) {
                error!("Association failed for photo {photo}: {e}");
                return Err(e);
            }
            debug!(
                "Photo {photo}: {count} of {} detections associated with {} boxes",
                detections.len(),
                boxes.len()
            );
            linked += count;
        }
        Ok(linked)
    }
}
