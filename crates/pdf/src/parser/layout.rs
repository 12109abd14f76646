//! Content-stream walking.
//!
//! One pass over a page's operators tracks the text state, the graphics state
//! stack, and the current path, and records what the page paints:
//!
//! ```text
//! content ops ──► text spans       (Tj, TJ, ', ")
//!             ──► image placements (Do on an image XObject)
//!             ──► image drawings   (inline images)
//!             ──► painted paths    (re/m/l/c/v/y/h + S/s/f/F/f*/B/B*/b/b*)
//! ```
//!
//! `Do` on a form XObject walks the form's own content stream with the
//! form matrix applied to the CTM, so text, images and paths inside forms
//! are reported like any other. The form's BBox does not clip.
//!
//! Everything is reported in PDF user space (origin bottom-left, y up).

use pagelabel_core::SpanColor;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, ObjectId, PageId, PdfBackend, PdfValue,
    XObjectInfo, XObjectKind,
};
use super::graphics::{
    color_from_operands, initial_color, matrix_from_operands, multiply, painting_mode,
    transform_point, transform_rect, GraphicsState, Matrix, PaintedPath, PathBuilder, IDENTITY,
};
use super::text::{normalize_span_text, strip_subset_prefix};
use crate::PdfError;

/// A run of text shown by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// `[x0, y0, x1, y1]` in user space.
    pub bounds: [f32; 4],
    /// Effective font size in user space.
    pub font_size: f32,
    /// Base font name without subset tag; the resource key when unknown.
    pub font_name: String,
    pub color: Option<SpanColor>,
}

/// What one page paints, in user space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub spans: Vec<TextSpan>,
    /// `(XObject name, placement bounds)` for every image XObject drawn.
    /// Images named by a form's own resources are qualified with the form
    /// names leading to them, as in `Fm0/Im1`.
    pub image_placements: Vec<(Vec<u8>, [f32; 4])>,
    /// Bounds of inline images.
    pub image_drawings: Vec<[f32; 4]>,
    pub paths: Vec<PaintedPath>,
}

/// Approximate character width as a fraction of font size; glyph widths are
/// not read.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Glyph extent above and below the baseline, as fractions of font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// Deepest chain of nested form XObjects that is walked.
const MAX_FORM_DEPTH: usize = 8;

/// Text state, as set by the text state and positioning operators.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = &self.line_matrix;
        let new_tx = m[0] * tx + m[2] * ty + m[4];
        let new_ty = m[1] * tx + m[3] * ty + m[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn char_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    /// Advance past `text` as if every glyph had the approximate width.
    fn advance_after_show(&mut self, text: &str) {
        let total: f32 = text
            .chars()
            .map(|ch| {
                let spacing = if ch == ' ' { self.word_spacing } else { 0.0 };
                self.char_advance() + self.char_spacing + spacing
            })
            .sum();
        self.advance_x(total);
    }
}

/// Walks one page's operators and collects a [`PageContent`].
struct Walker<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    fonts: Vec<BackendFontInfo>,
    xobjects: Vec<XObjectInfo>,
    /// Prefix for image names from the current resources; empty on the page.
    scope: Vec<u8>,
    /// Forms currently being walked, outermost first.
    forms: Vec<ObjectId>,
    text: TextState,
    graphics: GraphicsState,
    saved: Vec<GraphicsState>,
    path: PathBuilder,
    out: PageContent,
}

impl Walker<'_> {
    /// Apply a single operator.
    ///
    /// | Operators | Effect |
    /// |-----------|--------|
    /// | `q` `Q` `cm` | graphics state stack and CTM |
    /// | `g` `rg` `k` `cs` `sc` `scn` | fill colour |
    /// | `BT` `Tf` `Tm` `Td` `TD` `T*` `TL` `Tc` `Tw` `Tz` `Ts` | text state |
    /// | `Tj` `TJ` `'` `"` | text spans |
    /// | `Do` `BI` | image placements and drawings |
    /// | `m` `l` `c` `v` `y` `re` `h` | path construction |
    /// | `S` `s` `f` `F` `f*` `B` `B*` `b` `b*` `n` | path painting |
    fn apply(&mut self, op: &ContentOp) {
        let operands = op.operands.as_slice();
        let first_number = || operands.first().and_then(get_number_from_value);

        match op.operator.as_str() {
            "q" => self.saved.push(self.graphics.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.graphics = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from_operands(operands) {
                    self.graphics.ctm = multiply(&m, &self.graphics.ctm);
                }
            }

            "g" | "rg" | "k" => {
                self.graphics.fill = color_from_operands(operands);
            }
            "cs" => {
                if let Some(PdfValue::Name(space)) = operands.first() {
                    self.graphics.fill = initial_color(space);
                }
            }
            "sc" | "scn" => {
                if let Some(color) = color_from_operands(operands) {
                    self.graphics.fill = Some(color);
                }
            }

            "BT" => {
                self.text.text_matrix = IDENTITY;
                self.text.line_matrix = IDENTITY;
            }
            "Tf" => self.set_font(operands),
            "Tm" => {
                if let Some(m) = matrix_from_operands(operands) {
                    self.text.text_matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty, ..] = operands {
                    let tx = get_number_from_value(tx).unwrap_or(0.0);
                    let ty = get_number_from_value(ty).unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.text.leading = -ty;
                    }
                    self.text.translate_line(tx, ty);
                }
            }
            "T*" => self.text.next_line(),
            "TL" => {
                if let Some(v) = first_number() {
                    self.text.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = first_number() {
                    self.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = first_number() {
                    self.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = first_number() {
                    self.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = first_number() {
                    self.text.text_rise = v;
                }
            }

            "Tj" => {
                if let Some(first) = operands.first() {
                    self.show(std::slice::from_ref(first));
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    self.show(arr);
                }
            }
            "'" => {
                self.text.next_line();
                if let Some(first) = operands.first() {
                    self.show(std::slice::from_ref(first));
                }
            }
            "\"" => {
                if let [aw, ac, string, ..] = operands {
                    if let Some(aw) = get_number_from_value(aw) {
                        self.text.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(ac) {
                        self.text.char_spacing = ac;
                    }
                    self.text.next_line();
                    self.show(std::slice::from_ref(string));
                }
            }

            "Do" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    self.draw_xobject(name);
                }
            }
            "BI" => {
                let rect = transform_rect(&self.graphics.ctm, [0.0, 0.0, 1.0, 1.0]);
                self.out.image_drawings.push(rect);
            }

            operator => {
                if self.path.apply(&self.graphics.ctm, operator, operands) {
                    return;
                }
                if let Some((stroked, filled)) = painting_mode(operator) {
                    if matches!(operator, "s" | "b" | "b*") {
                        self.path.close();
                    }
                    if let Some(painted) = self.path.paint(stroked, filled) {
                        self.out.paths.push(painted);
                    }
                }
            }
        }
    }

    fn set_font(&mut self, operands: &[PdfValue]) {
        let [key, size, ..] = operands else {
            return;
        };
        let key = match key {
            PdfValue::Name(n) | PdfValue::Str(n) => n.clone(),
            _ => return,
        };
        let base = self
            .fonts
            .iter()
            .find(|info| info.name == key)
            .and_then(|info| info.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());

        self.text.font_name = strip_subset_prefix(&base).to_string();
        self.text.font_size = get_number_from_value(size).unwrap_or(0.0);
        self.text.font_key = key;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let font = self.fonts.iter().find(|info| info.name == self.text.font_key);
        let decoded = self.backend.decode_text(font, bytes);
        if decoded.is_empty() {
            super::backend::decode_text_simple(bytes)
        } else {
            decoded
        }
    }

    /// Text rendering matrix without the font size: text space to user space.
    fn text_to_user(&self) -> Matrix {
        multiply(&self.text.text_matrix, &self.graphics.ctm)
    }

    fn baseline_origin(&self) -> (f32, f32) {
        transform_point(&self.text_to_user(), 0.0, self.text.text_rise)
    }

    /// Show strings and kerning adjustments as one span. Large negative
    /// adjustments become word spaces.
    fn show(&mut self, elements: &[PdfValue]) {
        let start = self.baseline_origin();
        let trm = self.text_to_user();
        let font_size = self.text.font_size * (trm[2].powi(2) + trm[3].powi(2)).sqrt();

        let mut buf = String::new();
        for elem in elements {
            match elem {
                PdfValue::Str(bytes) => {
                    let fragment = self.decode(bytes);
                    self.text.advance_after_show(&fragment);
                    buf.push_str(&fragment);
                }
                val => {
                    if let Some(adj) = get_number_from_value(val) {
                        let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                        if dx > self.text.char_advance() * 0.3 && !buf.is_empty() {
                            buf.push(' ');
                        }
                        self.text.advance_x(dx);
                    }
                }
            }
        }

        let text = normalize_span_text(buf.trim_end());
        if text.trim().is_empty() {
            return;
        }

        let end = self.baseline_origin();
        let (x0, x1) = (start.0.min(end.0), start.0.max(end.0));
        let font_size = font_size.abs();
        self.out.spans.push(TextSpan {
            text,
            bounds: [
                x0,
                start.1 - DESCENT * font_size,
                x1,
                start.1 + ASCENT * font_size,
            ],
            font_size,
            font_name: self.text.font_name.clone(),
            color: self.graphics.fill.clone(),
        });
    }

    fn draw_xobject(&mut self, name: &[u8]) {
        let Some(kind) = self.xobjects.iter().find(|x| x.name == name).map(|x| x.kind.clone()) else {
            log::warn!(
                "page {:?}: Do references unknown XObject {}",
                self.page_id,
                String::from_utf8_lossy(name)
            );
            return;
        };

        match kind {
            Ok(XObjectKind::Image) => {
                let rect = transform_rect(&self.graphics.ctm, [0.0, 0.0, 1.0, 1.0]);
                let mut key = self.scope.clone();
                key.extend_from_slice(name);
                self.out.image_placements.push((key, rect));
            }
            Ok(XObjectKind::Form { id, matrix }) => self.draw_form(name, id, &matrix),
            Ok(XObjectKind::Other) | Err(_) => {}
        }
    }

    /// Walk a form XObject's content with a fresh path and graphics stack, then
    /// restore everything the form could have changed.
    fn draw_form(&mut self, name: &[u8], id: ObjectId, matrix: &Matrix) {
        let form_name = String::from_utf8_lossy(name);
        if self.forms.contains(&id) {
            log::warn!("page {:?}: form XObject {form_name} draws itself, skipped", self.page_id);
            return;
        }
        if self.forms.len() >= MAX_FORM_DEPTH {
            log::warn!(
                "page {:?}: form XObject {form_name} nested deeper than {MAX_FORM_DEPTH}, skipped",
                self.page_id
            );
            return;
        }

        let ops = match self
            .backend
            .form_content(id)
            .and_then(|data| self.backend.decode_content(&data))
        {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("page {:?}: cannot read form XObject {form_name}: {e}", self.page_id);
                return;
            }
        };
        let resources = self.backend.form_resources(id).unwrap_or_else(|e| {
            log::warn!("page {:?}: form XObject {form_name} resources: {e}", self.page_id);
            None
        });

        let outer_graphics = self.graphics.clone();
        let outer_saved = std::mem::take(&mut self.saved);
        let outer_text = self.text.clone();
        let outer_path = std::mem::take(&mut self.path);
        let outer_resources = resources.map(|res| {
            let mut scope = self.scope.clone();
            scope.extend_from_slice(name);
            scope.push(b'/');
            (
                std::mem::replace(&mut self.fonts, res.fonts),
                std::mem::replace(&mut self.xobjects, res.xobjects),
                std::mem::replace(&mut self.scope, scope),
            )
        });

        self.graphics.ctm = multiply(matrix, &self.graphics.ctm);
        self.forms.push(id);
        for op in &ops {
            self.apply(op);
        }
        self.forms.pop();
        log::trace!("page {:?}: walked form XObject {form_name}, {} ops", self.page_id, ops.len());

        self.graphics = outer_graphics;
        self.saved = outer_saved;
        self.text = outer_text;
        self.path = outer_path;
        if let Some((fonts, xobjects, scope)) = outer_resources {
            self.fonts = fonts;
            self.xobjects = xobjects;
            self.scope = scope;
        }
    }
}

/// Walk a page's content stream against the page's XObject list.
pub fn walk_page(
    backend: &dyn PdfBackend,
    page_id: PageId,
    xobjects: &[XObjectInfo],
) -> Result<PageContent, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut walker = Walker {
        backend,
        page_id,
        fonts: backend.page_fonts(page_id).unwrap_or_default(),
        xobjects: xobjects.to_vec(),
        scope: Vec::new(),
        forms: Vec::new(),
        text: TextState::default(),
        graphics: GraphicsState::default(),
        saved: Vec::new(),
        path: PathBuilder::default(),
        out: PageContent::default(),
    };
    for op in &ops {
        walker.apply(op);
    }

    log::debug!(
        "page {:?}: {} ops, {} spans, {} image placements, {} paths",
        page_id,
        ops.len(),
        walker.out.spans.len(),
        walker.out.image_placements.len(),
        walker.out.paths.len()
    );
    Ok(walker.out)
}
