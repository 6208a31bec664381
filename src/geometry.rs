//! Axis-aligned bounding box primitives in normalized image coordinates.
//!
//! Degenerate inputs never panic: overlap ratios with a zero denominator
//! return NaN, and any `ratio >= threshold` comparison on NaN is false, so
//! threshold filters exclude them naturally.

use serde::{Deserialize, Serialize};

/// Box in corner format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl BBox {
    /// Create a box from corner coordinates.
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box from top-left corner plus size (`x, y, w, h`).
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Create a box from center plus size, the detector output format.
    pub fn from_center(x_center: f32, y_center: f32, w: f32, h: f32) -> Self {
        let half_w = w / 2.0;
        let half_h = h / 2.0;
        Self::new(
            x_center - half_w,
            y_center - half_h,
            x_center + half_w,
            y_center + half_h,
        )
    }

    /// Box width (negative for inverted boxes).
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height (negative for inverted boxes).
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Scale to pixel coordinates and clamp to the image bounds.
    ///
    /// Returns `(x, y, width, height)`; width or height may be zero.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let w = image_width as f32;
        let h = image_height as f32;
        let left = (self.x1 * w).clamp(0.0, w).floor() as u32;
        let top = (self.y1 * h).clamp(0.0, h).floor() as u32;
        let right = (self.x2 * w).clamp(0.0, w).ceil() as u32;
        let bottom = (self.y2 * h).clamp(0.0, h).ceil() as u32;
        (
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }
}

/// Area of `a`; zero or negative for degenerate boxes.
pub fn area(a: &BBox) -> f32 {
    a.width() * a.height()
}

/// Overlap area of two boxes, zero when they do not overlap.
pub fn intersection_area(a: &BBox, b: &BBox) -> f32 {
    let right = a.x2.min(b.x2);
    let left = a.x1.max(b.x1);
    let bottom = a.y2.min(b.y2);
    let top = a.y1.max(b.y1);

    if right < left || bottom < top {
        return 0.0;
    }

    (right - left) * (bottom - top)
}

/// Area covered by either box.
pub fn union_area(a: &BBox, b: &BBox) -> f32 {
    area(a) + area(b) - intersection_area(a, b)
}

/// Intersection over union; NaN when the union is not positive.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let union = union_area(a, b);
    if union <= 0.0 {
        return f32::NAN;
    }
    intersection_area(a, b) / union
}

/// Fraction of `a` covered by `b`; NaN when `a` has no area.
///
/// Asymmetric, unlike [`iou`].
pub fn containment_ratio(a: &BBox, b: &BBox) -> f32 {
    let own = area(a);
    if own <= 0.0 {
        return f32::NAN;
    }
    intersection_area(a, b) / own
}
