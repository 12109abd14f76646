//! Page primitives from PDF files.
//!
//! [`Document`] wraps a parsed PDF and produces, per page, the raw primitives
//! the layout core works on: text spans with font and colour, image
//! placements, painted drawings, and ruled tables. Everything is reported in
//! top-left page coordinates (origin at the top-left of the crop box as the
//! page is displayed after `/Rotate`, y growing downwards), in PDF points.

use thiserror::Error;

use pagelabel_core::{BoundingBox, Drawing, DrawingKind, ImageRecord, PrimitiveError, RawPage, RawSpan};
use parser::backend::{LopdfBackend, PdfBackend, XObjectInfo, XObjectKind};
use parser::layout::{walk_page, PageContent};
use parser::table::{detect_tables, find_rulings, TableDetectorConfig};

pub mod parser;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps user-space rectangles onto the page's top-left coordinate system.
#[derive(Debug, Clone, Copy)]
struct PageFrame {
    /// Visible area in user space.
    view_box: [f32; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270.
    rotation: u16,
}

impl PageFrame {
    fn unrotated_size(&self) -> (f32, f32) {
        (self.view_box[2] - self.view_box[0], self.view_box[3] - self.view_box[1])
    }

    fn is_sideways(&self) -> bool {
        matches!(self.rotation, 90 | 270)
    }

    fn width(&self) -> f64 {
        let (w, h) = self.unrotated_size();
        f64::from(if self.is_sideways() { h } else { w })
    }

    fn height(&self) -> f64 {
        let (w, h) = self.unrotated_size();
        f64::from(if self.is_sideways() { w } else { h })
    }

    fn to_page(self, rect: [f32; 4]) -> BoundingBox {
        let [llx, _, _, ury] = self.view_box;
        let (w, h) = self.unrotated_size();
        let (x0, y0, x1, y1) = (rect[0] - llx, ury - rect[3], rect[2] - llx, ury - rect[1]);
        let [x0, y0, x1, y1] = match self.rotation {
            90 => [h - y1, x0, h - y0, x1],
            180 => [w - x1, h - y1, w - x0, h - y0],
            270 => [y0, w - x1, y1, w - x0],
            _ => [x0, y0, x1, y1],
        };
        BoundingBox::new(f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1))
    }
}

/// A parsed PDF document.
pub struct Document {
    backend: LopdfBackend,
    pub tables: TableDetectorConfig,
}

impl Document {
    /// Parse PDF bytes. Encrypted documents are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(Self {
            backend: LopdfBackend::load_bytes(bytes)?,
            tables: TableDetectorConfig::default(),
        })
    }

    /// Read and parse a PDF file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PdfError> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// 1-based page numbers, in order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.backend.pages().into_keys().collect()
    }

    /// Collect the raw primitives of one page.
    pub fn page_primitives(&self, page: u32) -> Result<RawPage, PdfError> {
        let page_id = *self
            .backend
            .pages()
            .get(&page)
            .ok_or(PdfError::PageNotFound(page))?;

        let frame = PageFrame {
            view_box: self.backend.page_box(page_id)?,
            rotation: self.backend.page_rotation(page_id)?,
        };
        if frame.rotation != 0 {
            log::debug!("page {page}: displayed rotated by {} degrees", frame.rotation);
        }
        let xobjects = self.backend.page_xobjects(page_id)?;
        let content = walk_page(&self.backend, page_id, &xobjects)?;

        let mut images: Vec<ImageRecord> = xobjects
            .iter()
            .filter_map(|info| {
                let name = String::from_utf8_lossy(&info.name).into_owned();
                let rects = match &info.kind {
                    Ok(XObjectKind::Image) => Ok(content
                        .image_placements
                        .iter()
                        .filter(|(placed, _)| *placed == info.name)
                        .map(|(_, rect)| frame.to_page(*rect))
                        .collect()),
                    Ok(_) => return None,
                    Err(reason) => {
                        log::warn!("page {page}: cannot resolve XObject {name}: {reason}");
                        Err(PrimitiveError::UnresolvedImage(name.clone(), reason.clone()))
                    }
                };
                Some(ImageRecord { name, rects })
            })
            .collect();
        images.extend(form_images(&content, &xobjects, frame));

        let raw = RawPage {
            width: frame.width(),
            height: frame.height(),
            spans: spans(&content, frame),
            images,
            drawings: drawings(&content, frame),
            tables: detect_tables(&find_rulings(&content.paths, &self.tables), &self.tables)
                .into_iter()
                .map(|rect| frame.to_page(rect))
                .collect(),
        };

        log::debug!(
            "page {page}: {}x{} pt, {} spans, {} images, {} drawings, {} tables",
            raw.width,
            raw.height,
            raw.spans.len(),
            raw.images.len(),
            raw.drawings.len(),
            raw.tables.len()
        );
        Ok(raw)
    }
}

fn spans(content: &PageContent, frame: PageFrame) -> Vec<RawSpan> {
    content
        .spans
        .iter()
        .map(|span| RawSpan {
            bbox: frame.to_page(span.bounds),
            text: span.text.clone(),
            font: (!span.font_name.is_empty()).then(|| span.font_name.clone()),
            color: span.color.clone(),
        })
        .collect()
}

/// Images placed from a form's own resources, one record per qualified name
/// in order of first placement.
fn form_images(content: &PageContent, xobjects: &[XObjectInfo], frame: PageFrame) -> Vec<ImageRecord> {
    let mut records: Vec<(Vec<u8>, Vec<BoundingBox>)> = Vec::new();
    for (name, rect) in &content.image_placements {
        if xobjects.iter().any(|info| info.name == *name) {
            continue;
        }
        match records.iter_mut().find(|(seen, _)| seen == name) {
            Some((_, rects)) => rects.push(frame.to_page(*rect)),
            None => records.push((name.clone(), vec![frame.to_page(*rect)])),
        }
    }

    records
        .into_iter()
        .map(|(name, rects)| ImageRecord {
            name: String::from_utf8_lossy(&name).into_owned(),
            rects: Ok(rects),
        })
        .collect()
}

/// Inline images first, then painted paths.
fn drawings(content: &PageContent, frame: PageFrame) -> Vec<Drawing> {
    let images = content.image_drawings.iter().map(|rect| Drawing {
        kind: DrawingKind::Image,
        rect: frame.to_page(*rect),
    });
    let paths = content.paths.iter().map(|path| Drawing {
        kind: DrawingKind::Path,
        rect: frame.to_page(path.bounds),
    });
    images.chain(paths).collect()
}

#[cfg(test)]
mod tests {
    use lopdf::Object;

    use super::parser::backend::tests::{sample_pdf, sample_pdf_with_page};
    use super::*;

    fn assert_box(actual: &BoundingBox, expected: [f64; 4]) {
        let got = [actual.x0, actual.y0, actual.x1, actual.y1];
        for (a, e) in got.iter().zip(expected) {
            assert!((a - e).abs() < 0.01, "expected {expected:?}, got {got:?}");
        }
    }

    fn primitives(content: &[u8]) -> RawPage {
        let doc = Document::from_bytes(&sample_pdf(content)).unwrap();
        doc.page_primitives(1).unwrap()
    }

    #[test]
    fn test_page_numbers_and_missing_page() {
        let doc = Document::from_bytes(&sample_pdf(b"")).unwrap();
        assert_eq!(doc.page_numbers(), vec![1]);
        assert!(matches!(doc.page_primitives(2), Err(PdfError::PageNotFound(2))));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            Document::from_bytes(b"%PDF-garbage"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_page_primitives_in_top_left_coordinates() {
        let page = primitives(
            b"BT /F1 12 Tf 1 0 0 1 50 700 Tm (Title) Tj ET\n\
              q 100 0 0 50 10 20 cm /Im0 Do Q\n\
              q 1 0 0 1 200 300 cm /Fm0 Do Q\n\
              0 0 0 RG 100 100 m 300 100 l S",
        );

        assert_eq!(page.width, 600.0);
        assert_eq!(page.height, 800.0);

        assert_eq!(page.spans.len(), 2);
        assert_eq!(page.spans[0].text, "Title");
        assert_eq!(page.spans[0].font.as_deref(), Some("Times-Bold"));
        assert_box(&page.spans[0].bbox, [50.0, 90.4, 80.0, 102.4]);
        // Shown by Fm0 at (10, 10) in form space.
        assert_eq!(page.spans[1].text, "Inside");
        assert_box(&page.spans[1].bbox, [210.0, 482.0, 240.0, 492.0]);

        assert_eq!(page.images.len(), 3);
        assert_eq!(page.images[0].name, "Im0");
        let rects = page.images[0].rects.as_ref().unwrap();
        assert_eq!(rects.len(), 1);
        assert_box(&rects[0], [10.0, 730.0, 110.0, 780.0]);
        assert_eq!(page.images[1].name, "Bad");
        assert!(page.images[1].rects.is_err());
        assert_eq!(page.images[2].name, "Fm0/Im1");
        let rects = page.images[2].rects.as_ref().unwrap();
        assert_box(&rects[0], [250.0, 460.0, 270.0, 480.0]);

        // The form itself is not a drawing.
        assert_eq!(page.drawings.len(), 1);
        assert_eq!(page.drawings[0].kind, DrawingKind::Path);
        assert_box(&page.drawings[0].rect, [100.0, 700.0, 300.0, 700.0]);

        assert!(page.tables.is_empty());
    }

    #[test]
    fn test_form_text_is_not_hidden_behind_a_picture() {
        let page = primitives(b"q 1 0 0 1 200 300 cm /Fm0 Do Q");
        let elements = pagelabel_core::extract_elements(
            &page,
            pagelabel_core::PageMeta::default(),
            &pagelabel_core::PipelineConfig::default(),
        );
        // "Inside" is set in Times-Bold.
        assert_eq!(elements.boxes(pagelabel_core::Label::Title).len(), 1);
        assert_eq!(elements.boxes(pagelabel_core::Label::Picture).len(), 1);
        assert_eq!(elements.total(), 2);
    }

    #[test]
    fn test_self_drawing_form_stops() {
        let page = primitives(b"/Fm1 Do");
        assert_eq!(page.spans.len(), 1);
        assert_eq!(page.spans[0].text, "Loop");
    }

    #[test]
    fn test_crop_box_defines_page_frame() {
        let doc = Document::from_bytes(&sample_pdf_with_page(
            b"BT /F1 12 Tf 1 0 0 1 100 600 Tm (Title) Tj ET",
            vec![(
                "CropBox",
                Object::Array(vec![50.into(), 100.into(), 550.into(), 700.into()]),
            )],
        ))
        .unwrap();
        let page = doc.page_primitives(1).unwrap();

        assert_eq!(page.width, 500.0);
        assert_eq!(page.height, 600.0);
        assert_box(&page.spans[0].bbox, [50.0, 90.4, 80.0, 102.4]);
    }

    #[test]
    fn test_rotated_page_reported_as_displayed() {
        let content = b"BT /F1 12 Tf 1 0 0 1 50 700 Tm (Title) Tj ET";
        let rotated = |degrees: i64| {
            let pdf = sample_pdf_with_page(content, vec![("Rotate", Object::Integer(degrees))]);
            Document::from_bytes(&pdf).unwrap().page_primitives(1).unwrap()
        };

        let page = rotated(90);
        assert_eq!((page.width, page.height), (800.0, 600.0));
        assert_box(&page.spans[0].bbox, [697.6, 50.0, 709.6, 80.0]);

        let page = rotated(180);
        assert_eq!((page.width, page.height), (600.0, 800.0));
        assert_box(&page.spans[0].bbox, [520.0, 697.6, 550.0, 709.6]);

        let page = rotated(270);
        assert_eq!((page.width, page.height), (800.0, 600.0));
        assert_box(&page.spans[0].bbox, [90.4, 520.0, 102.4, 550.0]);
    }

    #[test]
    fn test_ruled_table_detected() {
        let page = primitives(
            b"50 100 m 110 100 l 50 120 m 110 120 l 50 140 m 110 140 l\n\
              50 100 m 50 140 l 80 100 m 80 140 l 110 100 m 110 140 l S",
        );
        assert_eq!(page.tables.len(), 1);
        assert_box(&page.tables[0], [50.0, 660.0, 110.0, 700.0]);
    }

    #[test]
    fn test_unplaced_image_has_no_rects() {
        let page = primitives(b"");
        assert_eq!(page.images[0].rects, Ok(Vec::new()));
    }

    #[test]
    fn test_page_feeds_extraction() {
        let page = primitives(
            b"BT /F1 12 Tf 1 0 0 1 50 700 Tm (Caption) Tj ET\n\
              q 100 0 0 50 10 20 cm /Im0 Do Q",
        );
        let elements = pagelabel_core::extract_elements(
            &page,
            pagelabel_core::PageMeta::default(),
            &pagelabel_core::PipelineConfig::default(),
        );
        assert_eq!(elements.boxes(pagelabel_core::Label::Picture).len(), 1);
        assert_eq!(elements.total(), 2);
    }
}
