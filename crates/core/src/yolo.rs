//! Detection-model label export.
//!
//! Each box becomes one line `class_id x_center y_center width height`, with
//! coordinates normalised by the page image size.

use thiserror::Error;

use crate::elements::{Label, PageElements};
use crate::geometry::BoundingBox;

#[derive(Debug, Error, PartialEq)]
pub enum YoloError {
    #[error("Image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },
}

/// One normalised box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloBox {
    pub fn new(label: Label, bbox: &BoundingBox, image_width: f64, image_height: f64) -> Self {
        Self {
            class_id: label.class_id(),
            x_center: (bbox.x0 + bbox.x1) / 2.0 / image_width,
            y_center: (bbox.y0 + bbox.y1) / 2.0 / image_height,
            width: bbox.width() / image_width,
            height: bbox.height() / image_height,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// Normalise every box of the page, labels in class-id order.
pub fn to_yolo(elements: &PageElements) -> Result<Vec<YoloBox>, YoloError> {
    let (width, height) = (elements.meta.image_width, elements.meta.image_height);
    if !(width > 0.0 && height > 0.0) {
        return Err(YoloError::InvalidDimensions { width, height });
    }

    Ok(elements
        .iter()
        .flat_map(|(label, boxes)| {
            boxes
                .iter()
                .map(move |bbox| YoloBox::new(label, bbox, width, height))
        })
        .collect())
}

/// The label file body: one line per box, newline separated.
pub fn label_file(elements: &PageElements) -> Result<String, YoloError> {
    let lines: Vec<String> = to_yolo(elements)?.iter().map(YoloBox::to_line).collect();
    Ok(lines.join("\n"))
}
