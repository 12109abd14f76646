//! Axis-aligned box geometry shared by every pass.
//!
//! Coordinates are page coordinates with the origin at the top-left corner
//! and `y` growing downward, so `y0` is the top edge and `y1` the bottom.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0, x1, y1)` with `x0 <= x1` and `y0 <= y1`.
///
/// Serialised as a plain `[x0, y0, x1, y1]` array, which is the shape the
/// annotation JSON uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from two arbitrary corners, normalising the coordinate order.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// Tuning for [`are_bboxes_close`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    /// Horizontal gap strictly below which two boxes count as close.
    pub threshold_x: f64,
    /// Vertical gap strictly below which two boxes count as close.
    pub threshold_y: f64,
    /// Overlap ratio above which two boxes are close regardless of gaps.
    pub overlap_threshold: f64,
}

impl Default for Proximity {
    fn default() -> Self {
        Self {
            threshold_x: 5.0,
            threshold_y: 2.0,
            overlap_threshold: 0.0001,
        }
    }
}

/// True when the projections intersect on both axes. Touching edges do not count.
pub fn do_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.x1 <= b.x0 || a.x0 >= b.x1 || a.y1 <= b.y0 || a.y0 >= b.y1)
}

/// True when `inner` lies within `outer` grown by `tolerance` on every side.
pub fn is_inside(inner: &BoundingBox, outer: &BoundingBox, tolerance: f64) -> bool {
    inner.x0 >= outer.x0 - tolerance
        && inner.y0 >= outer.y0 - tolerance
        && inner.x1 <= outer.x1 + tolerance
        && inner.y1 <= outer.y1 + tolerance
}

/// Intersection area divided by the area of the smaller box.
///
/// Returns `None` when the boxes do not intersect at all. A degenerate
/// (zero-area) operand that still touches the other box yields a ratio of
/// `1.0`: it lies entirely on it.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> Option<f64> {
    let left = a.x0.max(b.x0);
    let top = a.y0.max(b.y0);
    let right = a.x1.min(b.x1);
    let bottom = a.y1.min(b.y1);

    if right < left || bottom < top {
        return None;
    }

    let min_area = a.area().min(b.area());
    if min_area <= 0.0 {
        return Some(1.0);
    }

    Some((right - left) * (bottom - top) / min_area)
}

/// True when [`overlap_ratio`] exceeds `threshold`.
pub fn check_overlap(a: &BoundingBox, b: &BoundingBox, threshold: f64) -> bool {
    overlap_ratio(a, b).is_some_and(|ratio| ratio > threshold)
}

/// Smallest box containing both inputs.
pub fn merge_boxes(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    BoundingBox {
        x0: a.x0.min(b.x0),
        y0: a.y0.min(b.y0),
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
    }
}

/// Gap between two intervals, or `0.0` when they overlap or touch.
fn interval_gap(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    if a0 > b1 {
        a0 - b1
    } else if b0 > a1 {
        b0 - a1
    } else {
        0.0
    }
}

/// Overlapping boxes, or boxes separated by less than the configured gap on
/// both axes, are close.
pub fn are_bboxes_close(a: &BoundingBox, b: &BoundingBox, p: &Proximity) -> bool {
    if check_overlap(a, b, p.overlap_threshold) {
        return true;
    }
    interval_gap(a.x0, a.x1, b.x0, b.x1) < p.threshold_x
        && interval_gap(a.y0, a.y1, b.y0, b.y1) < p.threshold_y
}
