//! Graphics state: transformation matrices, fill colour, and path painting.

use pagelabel_core::SpanColor;

use super::backend::{get_number_from_value, numbers, PdfValue};

/// A PDF matrix `[a, b, c, d, e, f]`.
pub type Matrix = [f32; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n` in PDF's row-vector convention: applying the product applies `m`
/// first, then `n`.
pub fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

pub fn transform_point(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Axis-aligned bounds `[x0, y0, x1, y1]` of a rectangle after transformation.
pub fn transform_rect(m: &Matrix, rect: [f32; 4]) -> [f32; 4] {
    let corners = [
        transform_point(m, rect[0], rect[1]),
        transform_point(m, rect[2], rect[1]),
        transform_point(m, rect[0], rect[3]),
        transform_point(m, rect[2], rect[3]),
    ];
    bounds(&corners).unwrap_or(rect)
}

/// Bounds of a point set, `None` when empty.
pub fn bounds(points: &[(f32, f32)]) -> Option<[f32; 4]> {
    let (&(fx, fy), rest) = points.split_first()?;
    Some(rest.iter().fold([fx, fy, fx, fy], |acc, &(x, y)| {
        [acc[0].min(x), acc[1].min(y), acc[2].max(x), acc[3].max(y)]
    }))
}

pub fn matrix_from_operands(operands: &[PdfValue]) -> Option<Matrix> {
    let vals = numbers(operands.get(..6)?)?;
    Some([vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
}

/// Number of components in the initial colour of a colour space.
fn components_of(space: &[u8]) -> Option<usize> {
    match space {
        b"DeviceGray" | b"CalGray" | b"G" => Some(1),
        b"DeviceRGB" | b"CalRGB" | b"Lab" | b"RGB" => Some(3),
        b"DeviceCMYK" | b"CMYK" => Some(4),
        _ => None,
    }
}

/// Initial (black) colour of a device or CIE colour space. Named resources
/// such as ICC profiles are not resolved and give `None`.
pub fn initial_color(space: &[u8]) -> Option<SpanColor> {
    components_of(space).map(|n| match n {
        4 => SpanColor::Components(vec![0.0, 0.0, 0.0, 1.0]),
        n => SpanColor::Components(vec![0.0; n]),
    })
}

/// Colour set by `sc` / `scn`: numeric components, or a pattern name.
pub fn color_from_operands(operands: &[PdfValue]) -> Option<SpanColor> {
    if let Some(PdfValue::Name(pattern)) = operands.last() {
        return Some(SpanColor::Named(String::from_utf8_lossy(pattern).into_owned()));
    }
    let components: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
    (!components.is_empty()).then_some(SpanColor::Components(components))
}

/// The parts of the graphics state the walkers read.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub ctm: Matrix,
    /// `None` until the content sets a fill colour; the default is black.
    pub fill: Option<SpanColor>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill: None,
        }
    }
}

/// A straight segment of a painted path, in user space after the CTM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

/// A painted path: its bounds and straight edges, in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    pub bounds: [f32; 4],
    pub segments: Vec<Segment>,
    pub stroked: bool,
    pub filled: bool,
}

/// Accumulates the current path between construction and painting
/// operators. Points are transformed by the CTM as they are added.
#[derive(Debug, Default)]
pub struct PathBuilder {
    points: Vec<(f32, f32)>,
    segments: Vec<Segment>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    pub fn move_to(&mut self, ctm: &Matrix, x: f32, y: f32) {
        let p = transform_point(ctm, x, y);
        self.points.push(p);
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    pub fn line_to(&mut self, ctm: &Matrix, x: f32, y: f32) {
        let p = transform_point(ctm, x, y);
        if let Some(from) = self.current {
            self.segments.push(Segment { from, to: p });
        }
        self.points.push(p);
        self.current = Some(p);
    }

    /// Curves contribute their control points to the bounds but no segment.
    pub fn curve_to(&mut self, ctm: &Matrix, coords: &[f32]) {
        for pair in coords.chunks_exact(2) {
            self.points.push(transform_point(ctm, pair[0], pair[1]));
        }
        self.current = self.points.last().copied();
    }

    pub fn close(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.subpath_start) {
            if from != to {
                self.segments.push(Segment { from, to });
            }
            self.current = Some(to);
        }
    }

    pub fn rect(&mut self, ctm: &Matrix, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(ctm, x, y);
        self.line_to(ctm, x + w, y);
        self.line_to(ctm, x + w, y + h);
        self.line_to(ctm, x, y + h);
        self.close();
    }

    /// Apply one path construction operator. Returns false for any other
    /// operator.
    pub fn apply(&mut self, ctm: &Matrix, operator: &str, operands: &[PdfValue]) -> bool {
        let vals = numbers(operands).unwrap_or_default();
        match (operator, vals.as_slice()) {
            ("m", &[x, y]) => self.move_to(ctm, x, y),
            ("l", &[x, y]) => self.line_to(ctm, x, y),
            ("c", coords) if coords.len() == 6 => self.curve_to(ctm, coords),
            ("v" | "y", coords) if coords.len() == 4 => self.curve_to(ctm, coords),
            ("re", &[x, y, w, h]) => self.rect(ctm, x, y, w, h),
            ("h", _) => self.close(),
            ("m" | "l" | "c" | "v" | "y" | "re", _) => {}
            _ => return false,
        }
        true
    }

    /// Finish the current path. Returns it when painted and non-empty.
    pub fn paint(&mut self, stroked: bool, filled: bool) -> Option<PaintedPath> {
        let points = std::mem::take(&mut self.points);
        let segments = std::mem::take(&mut self.segments);
        self.current = None;
        self.subpath_start = None;

        if !(stroked || filled) {
            return None;
        }
        Some(PaintedPath {
            bounds: bounds(&points)?,
            segments,
            stroked,
            filled,
        })
    }
}

/// `(stroked, filled)` for a path painting operator; `n` paints nothing.
pub fn painting_mode(operator: &str) -> Option<(bool, bool)> {
    match operator {
        "S" | "s" => Some((true, false)),
        "f" | "F" | "f*" => Some((false, true)),
        "B" | "B*" | "b" | "b*" => Some((true, true)),
        "n" => Some((false, false)),
        _ => None,
    }
}
