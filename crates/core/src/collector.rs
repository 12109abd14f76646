//! Primitive collection: turns one page's raw PDF primitives into picture and
//! table regions plus the text primitives the classifier consumes.

use thiserror::Error;

use crate::elements::{Label, PageElements, PageMeta};
use crate::geometry::{check_overlap, BoundingBox};

/// Why an image's placement rectangles could not be determined.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrimitiveError {
    #[error("Image {0} could not be resolved: {1}")]
    UnresolvedImage(String, String),
}

/// A span's fill colour as reported by the source.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanColor {
    /// Device colour components in `0.0..=1.0` (gray, RGB, or CMYK).
    Components(Vec<f32>),
    /// A named or textual colour such as `"black"` or `"#000000"`.
    Named(String),
}

impl SpanColor {
    /// True unless the colour is black.
    pub fn is_not_black(&self) -> bool {
        match self {
            SpanColor::Components(c) => match c.len() {
                // CMYK: full key, or full rich black.
                4 => !(c[3] >= 1.0 || c[..3].iter().all(|v| *v >= 1.0)),
                _ => c.iter().any(|v| *v > 0.0),
            },
            SpanColor::Named(name) => {
                let name = name.trim();
                !(name.is_empty()
                    || ["black", "#000000", "(0, 0, 0)", "000000", "0"].contains(&name))
            }
        }
    }
}

/// A text run as produced by the PDF source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub bbox: BoundingBox,
    pub text: String,
    pub font: Option<String>,
    pub color: Option<SpanColor>,
}

/// Every placement of one embedded raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub name: String,
    pub rects: Result<Vec<BoundingBox>, PrimitiveError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingKind {
    Image,
    Path,
}

/// A painted graphics object with its bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawing {
    pub kind: DrawingKind,
    pub rect: BoundingBox,
}

/// All raw primitives of one page, in top-left page coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub width: f64,
    pub height: f64,
    pub spans: Vec<RawSpan>,
    pub images: Vec<ImageRecord>,
    pub drawings: Vec<Drawing>,
    pub tables: Vec<BoundingBox>,
}

/// A trimmed, non-empty text span ready for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub bbox: BoundingBox,
    pub text: String,
    /// Lowercase font name, empty when unknown.
    pub font: String,
    pub is_bold: bool,
    pub is_not_black: bool,
}

impl TextPrimitive {
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
            font: String::new(),
            is_bold: false,
            is_not_black: false,
        }
    }

    /// Top edge of the span.
    pub fn y(&self) -> f64 {
        self.bbox.y0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Overlap ratio above which an image drawing duplicates a known picture.
    pub picture_dedup_overlap: f64,
    /// Overlap ratio above which a text span is dropped as part of a picture
    /// or table.
    pub restricted_overlap: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            picture_dedup_overlap: 0.1,
            restricted_overlap: 0.0,
        }
    }
}

/// Collect picture and table regions into fresh page elements and return the
/// text primitives that fall outside them.
pub fn collect(
    page: &RawPage,
    meta: PageMeta,
    config: &CollectorConfig,
) -> (PageElements, Vec<TextPrimitive>) {
    let mut elements = PageElements::new(meta);

    for image in &page.images {
        match &image.rects {
            Ok(rects) => {
                for rect in rects {
                    elements.push(Label::Picture, *rect);
                }
            }
            Err(e) => log::warn!("skipping image: {e}"),
        }
    }

    for drawing in page.drawings.iter().filter(|d| d.kind == DrawingKind::Image) {
        let duplicate = elements
            .boxes(Label::Picture)
            .iter()
            .any(|existing| check_overlap(&drawing.rect, existing, config.picture_dedup_overlap));
        if !duplicate {
            elements.push(Label::Picture, drawing.rect);
        }
    }

    for table in &page.tables {
        elements.push(Label::Table, *table);
    }

    let restricted: Vec<BoundingBox> = elements
        .boxes(Label::Picture)
        .iter()
        .chain(elements.boxes(Label::Table))
        .copied()
        .collect();

    let primitives: Vec<TextPrimitive> = page
        .spans
        .iter()
        .filter_map(|span| {
            let text = span.text.trim();
            if text.is_empty() {
                return None;
            }
            if restricted
                .iter()
                .any(|area| check_overlap(&span.bbox, area, config.restricted_overlap))
            {
                return None;
            }
            let font = span.font.as_deref().unwrap_or_default().to_lowercase();
            Some(TextPrimitive {
                bbox: span.bbox,
                text: text.to_string(),
                is_bold: font.contains("bold"),
                font,
                is_not_black: span.color.as_ref().is_some_and(SpanColor::is_not_black),
            })
        })
        .collect();

    log::debug!(
        "collected {} pictures, {} tables, {}/{} text spans",
        elements.boxes(Label::Picture).len(),
        elements.boxes(Label::Table).len(),
        primitives.len(),
        page.spans.len()
    );

    (elements, primitives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1)
    }

    fn span(text: &str, bbox: BoundingBox) -> RawSpan {
        RawSpan {
            bbox,
            text: text.to_string(),
            font: Some("TimesNewRoman-Bold".to_string()),
            color: None,
        }
    }

    fn page() -> RawPage {
        RawPage {
            width: 600.0,
            height: 800.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_color_black_detection() {
        assert!(!SpanColor::Components(vec![0.0]).is_not_black());
        assert!(!SpanColor::Components(vec![0.0, 0.0, 0.0]).is_not_black());
        assert!(SpanColor::Components(vec![1.0, 0.0, 0.0]).is_not_black());
        assert!(!SpanColor::Components(vec![0.0, 0.0, 0.0, 1.0]).is_not_black());
        assert!(SpanColor::Components(vec![0.0, 1.0, 0.0, 0.0]).is_not_black());
        assert!(!SpanColor::Named("#000000".to_string()).is_not_black());
        assert!(!SpanColor::Named("black".to_string()).is_not_black());
        assert!(SpanColor::Named("#ff0000".to_string()).is_not_black());
    }

    #[test]
    fn test_collect_pictures_skips_failed_images() {
        let mut raw = page();
        raw.images = vec![
            ImageRecord {
                name: "Im1".to_string(),
                rects: Ok(vec![bb(10.0, 10.0, 100.0, 100.0), bb(10.0, 200.0, 100.0, 300.0)]),
            },
            ImageRecord {
                name: "Im2".to_string(),
                rects: Err(PrimitiveError::UnresolvedImage(
                    "Im2".to_string(),
                    "dangling reference".to_string(),
                )),
            },
        ];

        let (elements, _) = collect(&raw, PageMeta::default(), &CollectorConfig::default());
        assert_eq!(elements.boxes(Label::Picture).len(), 2);
    }

    #[test]
    fn test_collect_dedups_image_drawings() {
        let mut raw = page();
        raw.images = vec![ImageRecord {
            name: "Im1".to_string(),
            rects: Ok(vec![bb(10.0, 10.0, 100.0, 100.0)]),
        }];
        raw.drawings = vec![
            Drawing {
                kind: DrawingKind::Image,
                rect: bb(12.0, 12.0, 98.0, 98.0),
            },
            Drawing {
                kind: DrawingKind::Image,
                rect: bb(300.0, 300.0, 400.0, 400.0),
            },
            Drawing {
                kind: DrawingKind::Path,
                rect: bb(500.0, 500.0, 550.0, 550.0),
            },
        ];

        let (elements, _) = collect(&raw, PageMeta::default(), &CollectorConfig::default());
        assert_eq!(
            elements.boxes(Label::Picture),
            &[bb(10.0, 10.0, 100.0, 100.0), bb(300.0, 300.0, 400.0, 400.0)]
        );
    }

    #[test]
    fn test_collect_suppresses_text_in_restricted_areas() {
        let mut raw = page();
        raw.tables = vec![bb(50.0, 400.0, 500.0, 600.0)];
        raw.images = vec![ImageRecord {
            name: "Im1".to_string(),
            rects: Ok(vec![bb(50.0, 100.0, 200.0, 200.0)]),
        }];
        raw.spans = vec![
            span("cell", bb(60.0, 410.0, 90.0, 420.0)),
            span("caption", bb(60.0, 205.0, 120.0, 215.0)),
            span("partly", bb(190.0, 150.0, 260.0, 160.0)),
            span("touching", bb(200.0, 150.0, 260.0, 160.0)),
        ];

        let (elements, prims) = collect(&raw, PageMeta::default(), &CollectorConfig::default());
        assert_eq!(elements.boxes(Label::Table).len(), 1);
        let texts: Vec<&str> = prims.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["caption", "touching"]);
    }

    #[test]
    fn test_collect_normalises_span_attributes() {
        let mut raw = page();
        raw.spans = vec![
            span("  Heading  ", bb(10.0, 100.0, 90.0, 112.0)),
            span("   ", bb(10.0, 120.0, 90.0, 132.0)),
            RawSpan {
                bbox: bb(10.0, 140.0, 90.0, 152.0),
                text: "plain".to_string(),
                font: None,
                color: Some(SpanColor::Components(vec![0.0, 0.0, 1.0])),
            },
        ];

        let (_, prims) = collect(&raw, PageMeta::default(), &CollectorConfig::default());
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[0].text, "Heading");
        assert_eq!(prims[0].font, "timesnewroman-bold");
        assert!(prims[0].is_bold);
        assert!(!prims[0].is_not_black);
        assert_eq!(prims[1].font, "");
        assert!(!prims[1].is_bold);
        assert!(prims[1].is_not_black);
    }
}
