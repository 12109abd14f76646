//! Ruled-table detection from painted paths.
//!
//! Tables drawn with cell borders leave thin horizontal and vertical lines in
//! the content stream, either as stroked segments or as thin filled
//! rectangles. Rulings that touch are grouped, and a group that forms a grid
//! of at least two cells is reported as one table.

use super::graphics::PaintedPath;

/// Tuning knobs for ruled-table detection. All distances are in PDF points.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Thickest filled rectangle still treated as a line, and the largest
    /// drift off the axis for a stroked segment.
    pub max_thickness: f32,
    /// Shortest line kept as a ruling.
    pub min_length: f32,
    /// Gap up to which two rulings count as touching.
    pub join_tolerance: f32,
    pub min_horizontal: usize,
    pub min_vertical: usize,
    /// Minimum number of grid cells, so that a single framed box is not a
    /// table.
    pub min_cells: usize,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            max_thickness: 2.0,
            min_length: 10.0,
            join_tolerance: 2.0,
            min_horizontal: 2,
            min_vertical: 2,
            min_cells: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A horizontal or vertical line segment, as a (possibly zero-thickness)
/// rectangle `[x0, y0, x1, y1]` in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub orientation: Orientation,
    pub rect: [f32; 4],
}

impl Ruling {
    /// Position across the line: y for horizontal rulings, x for vertical.
    fn offset(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => (self.rect[1] + self.rect[3]) / 2.0,
            Orientation::Vertical => (self.rect[0] + self.rect[2]) / 2.0,
        }
    }

    fn touches(&self, other: &Ruling, tolerance: f32) -> bool {
        self.rect[0] - tolerance <= other.rect[2]
            && other.rect[0] - tolerance <= self.rect[2]
            && self.rect[1] - tolerance <= other.rect[3]
            && other.rect[1] - tolerance <= self.rect[3]
    }
}

/// Classify a thin rectangle as a ruling.
fn ruling_from_rect(rect: [f32; 4], config: &TableDetectorConfig) -> Option<Ruling> {
    let width = rect[2] - rect[0];
    let height = rect[3] - rect[1];
    let orientation = if height <= config.max_thickness && width >= config.min_length {
        Orientation::Horizontal
    } else if width <= config.max_thickness && height >= config.min_length {
        Orientation::Vertical
    } else {
        return None;
    };
    Some(Ruling { orientation, rect })
}

/// Extract rulings from painted paths.
///
/// Filled paths count when their whole bounds are a thin rectangle. Stroked
/// paths contribute each of their axis-aligned straight segments; curves and
/// diagonals are ignored.
pub fn find_rulings(paths: &[PaintedPath], config: &TableDetectorConfig) -> Vec<Ruling> {
    let mut rulings = Vec::new();
    for path in paths {
        if path.filled {
            if let Some(ruling) = ruling_from_rect(path.bounds, config) {
                rulings.push(ruling);
                continue;
            }
        }
        if !path.stroked {
            continue;
        }
        for seg in &path.segments {
            let rect = [
                seg.from.0.min(seg.to.0),
                seg.from.1.min(seg.to.1),
                seg.from.0.max(seg.to.0),
                seg.from.1.max(seg.to.1),
            ];
            rulings.extend(ruling_from_rect(rect, config));
        }
    }
    rulings
}

/// Union-find over ruling indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Number of distinct line positions, merging offsets closer than
/// `tolerance`.
fn distinct_offsets(mut offsets: Vec<f32>, tolerance: f32) -> usize {
    offsets.sort_by(f32::total_cmp);
    let mut count = 0;
    let mut last: Option<f32> = None;
    for offset in offsets {
        match last {
            Some(prev) if offset - prev <= tolerance => {}
            _ => count += 1,
        }
        last = Some(offset);
    }
    count
}

fn is_grid(group: &[Ruling], config: &TableDetectorConfig) -> bool {
    let (horizontal, vertical): (Vec<&Ruling>, Vec<&Ruling>) = group
        .iter()
        .partition(|r| r.orientation == Orientation::Horizontal);
    if horizontal.len() < config.min_horizontal || vertical.len() < config.min_vertical {
        return false;
    }

    let rows = distinct_offsets(horizontal.iter().map(|r| r.offset()).collect(), config.join_tolerance);
    let cols = distinct_offsets(vertical.iter().map(|r| r.offset()).collect(), config.join_tolerance);
    rows.saturating_sub(1) * cols.saturating_sub(1) >= config.min_cells
}

/// Group touching rulings and return the bounds of every group that forms a
/// table grid, in user space.
pub fn detect_tables(rulings: &[Ruling], config: &TableDetectorConfig) -> Vec<[f32; 4]> {
    let mut sets = DisjointSet::new(rulings.len());
    for i in 0..rulings.len() {
        for j in i + 1..rulings.len() {
            if rulings[i].touches(&rulings[j], config.join_tolerance) {
                sets.union(i, j);
            }
        }
    }

    // Groups keyed by root, in order of first appearance.
    let mut groups: Vec<(usize, Vec<Ruling>)> = Vec::new();
    for (i, ruling) in rulings.iter().enumerate() {
        let root = sets.find(i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(*ruling),
            None => groups.push((root, vec![*ruling])),
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| is_grid(group, config))
        .map(|(_, group)| {
            group.iter().skip(1).fold(group[0].rect, |acc, r| {
                [
                    acc[0].min(r.rect[0]),
                    acc[1].min(r.rect[1]),
                    acc[2].max(r.rect[2]),
                    acc[3].max(r.rect[3]),
                ]
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::graphics::{PathBuilder, IDENTITY};
    use super::*;

    /// A stroked grid with its lower-left corner at `(x, y)`.
    fn grid(x: f32, y: f32, cols: usize, rows: usize, cell: f32) -> PaintedPath {
        let mut path = PathBuilder::default();
        let (w, h) = (cols as f32 * cell, rows as f32 * cell);
        for r in 0..=rows {
            let ly = y + r as f32 * cell;
            path.move_to(&IDENTITY, x, ly);
            path.line_to(&IDENTITY, x + w, ly);
        }
        for c in 0..=cols {
            let lx = x + c as f32 * cell;
            path.move_to(&IDENTITY, lx, y);
            path.line_to(&IDENTITY, lx, y + h);
        }
        path.paint(true, false).unwrap()
    }

    fn filled(rect: [f32; 4]) -> PaintedPath {
        let mut path = PathBuilder::default();
        path.rect(&IDENTITY, rect[0], rect[1], rect[2] - rect[0], rect[3] - rect[1]);
        path.paint(false, true).unwrap()
    }

    fn detect(paths: &[PaintedPath]) -> Vec<[f32; 4]> {
        let config = TableDetectorConfig::default();
        detect_tables(&find_rulings(paths, &config), &config)
    }

    #[test]
    fn test_stroked_grid_is_a_table() {
        let tables = detect(&[grid(50.0, 100.0, 3, 2, 20.0)]);
        assert_eq!(tables, vec![[50.0, 100.0, 110.0, 140.0]]);
    }

    #[test]
    fn test_single_frame_is_not_a_table() {
        let tables = detect(&[grid(50.0, 100.0, 1, 1, 40.0)]);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_separate_grids_are_separate_tables() {
        let tables = detect(&[grid(50.0, 100.0, 2, 2, 20.0), grid(50.0, 400.0, 2, 1, 30.0)]);
        assert_eq!(
            tables,
            vec![[50.0, 100.0, 90.0, 140.0], [50.0, 400.0, 110.0, 430.0]]
        );
    }

    #[test]
    fn test_thin_filled_rects_are_rulings() {
        let mut paths = Vec::new();
        for y in [0.0, 20.0, 40.0] {
            paths.push(filled([0.0, y, 60.0, y + 0.5]));
        }
        for x in [0.0, 30.0, 60.0] {
            paths.push(filled([x, 0.0, x + 0.5, 40.5]));
        }
        let tables = detect(&paths);
        assert_eq!(tables, vec![[0.0, 0.0, 60.5, 40.5]]);
    }

    #[test]
    fn test_shaded_cells_and_diagonals_are_not_rulings() {
        let config = TableDetectorConfig::default();
        let mut diagonal = PathBuilder::default();
        diagonal.move_to(&IDENTITY, 0.0, 0.0);
        diagonal.line_to(&IDENTITY, 50.0, 50.0);
        let paths = vec![
            filled([0.0, 0.0, 50.0, 20.0]),
            diagonal.paint(true, false).unwrap(),
            filled([0.0, 0.0, 5.0, 0.5]),
        ];
        assert!(find_rulings(&paths, &config).is_empty());
    }

    #[test]
    fn test_distinct_offsets_merges_close_lines() {
        assert_eq!(distinct_offsets(vec![10.0, 10.5, 30.0, 11.0, 50.0], 2.0), 3);
        assert_eq!(distinct_offsets(Vec::new(), 2.0), 0);
    }
}
