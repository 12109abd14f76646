//! Column-aware merging of same-label blocks.
//!
//! All boxes are laid out in scan order (`y0`, then `x0`), which stands in for
//! reading order without explicit column detection. Two boxes of the same
//! label merge into their union when they are nested, overlapping, or
//! adjacent, unless a box of a different label separates them: either by
//! sitting between them in scan order or by lying wholly within the gap
//! between them on the page.
//!
//! Instead of deleting from the list while scanning it, a round keeps a
//! liveness mask over the sorted boxes. Absorbed boxes are marked dead; the
//! survivors' relative order is the order the scan would have left them in.

use crate::elements::{Label, LabeledBox, PageElements};
use crate::geometry::{do_overlap, is_inside, merge_boxes, BoundingBox};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Largest vertical gap bridged between horizontally overlapping boxes.
    pub vertical_gap: f64,
    /// Largest horizontal gap bridged between vertically overlapping boxes.
    pub horizontal_gap: f64,
    /// Horizontal gap used instead for numbered and marked lists.
    pub list_horizontal_gap: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            vertical_gap: 15.0,
            horizontal_gap: 5.0,
            list_horizontal_gap: 30.0,
        }
    }
}

fn x_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.x1 < b.x0 || a.x0 > b.x1)
}

fn y_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.y1 < b.y0 || a.y0 > b.y1)
}

fn vertically_close(a: &BoundingBox, b: &BoundingBox, max_gap: f64) -> bool {
    let gap = if a.y1 < b.y0 { b.y0 - a.y1 } else { a.y0 - b.y1 };
    gap.abs() <= max_gap && x_overlap(a, b)
}

fn horizontally_close(a: &BoundingBox, b: &BoundingBox, max_gap: f64) -> bool {
    let gap = if a.x1 < b.x0 { b.x0 - a.x1 } else { a.x0 - b.x1 };
    gap.abs() <= max_gap && y_overlap(a, b)
}

/// Whether two same-label boxes are close enough to become one block.
pub fn should_merge(label: Label, a: &BoundingBox, b: &BoundingBox, config: &MergeConfig) -> bool {
    let horizontal_gap = if label.is_list() {
        config.list_horizontal_gap
    } else {
        config.horizontal_gap
    };

    is_inside(a, b, 0.0)
        || is_inside(b, a, 0.0)
        || do_overlap(a, b)
        || vertically_close(a, b, config.vertical_gap)
        || horizontally_close(a, b, horizontal_gap)
}

/// The open strip of page separating two disjoint boxes, bounded by their
/// shared extent on the other axis, and the axis the gap runs along.
fn gap_corridor(a: &BoundingBox, b: &BoundingBox) -> Option<(BoundingBox, Axis)> {
    let (left, right) = if a.x1 <= b.x0 { (a, b) } else { (b, a) };
    if left.x1 <= right.x0 {
        let corridor = BoundingBox::new(left.x1, a.y0.max(b.y0), right.x0, a.y1.min(b.y1));
        return Some((corridor, Axis::Horizontal));
    }

    let (upper, lower) = if a.y1 <= b.y0 { (a, b) } else { (b, a) };
    if upper.y1 <= lower.y0 {
        let corridor = BoundingBox::new(a.x0.max(b.x0), upper.y1, a.x1.min(b.x1), lower.y0);
        return Some((corridor, Axis::Vertical));
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// True when `other` lies wholly inside the gap on the separating axis and
/// overlaps the corridor on the other one. A box that only pokes into the
/// gap, like an inline formula taller than its line, does not separate.
fn separates(other: &BoundingBox, corridor: &BoundingBox, axis: Axis) -> bool {
    match axis {
        Axis::Horizontal => {
            corridor.x0 <= other.x0
                && other.x1 <= corridor.x1
                && other.y1 > corridor.y0
                && other.y0 < corridor.y1
        }
        Axis::Vertical => {
            corridor.y0 <= other.y0
                && other.y1 <= corridor.y1
                && other.x1 > corridor.x0
                && other.x0 < corridor.x1
        }
    }
}

/// A differently labelled live box separates `blocks[i]` from `blocks[j]`.
fn is_blocked(blocks: &[LabeledBox], alive: &[bool], i: usize, j: usize) -> bool {
    let label = blocks[i].label;

    let between_in_scan = (i + 1..j).any(|k| alive[k] && blocks[k].label != label);
    if between_in_scan {
        return true;
    }

    let Some((corridor, axis)) = gap_corridor(&blocks[i].bbox, &blocks[j].bbox) else {
        return false;
    };
    blocks
        .iter()
        .zip(alive)
        .any(|(other, &live)| live && other.label != label && separates(&other.bbox, &corridor, axis))
}

fn scan_order(a: &LabeledBox, b: &LabeledBox) -> std::cmp::Ordering {
    a.bbox
        .y0
        .total_cmp(&b.bbox.y0)
        .then(a.bbox.x0.total_cmp(&b.bbox.x0))
}

/// One scan over blocks sorted in scan order. Returns the survivors in order
/// and whether anything merged.
fn merge_round(mut blocks: Vec<LabeledBox>, config: &MergeConfig) -> (Vec<LabeledBox>, bool) {
    let mut alive = vec![true; blocks.len()];
    let mut merged_any = false;

    for i in 0..blocks.len() {
        if !alive[i] {
            continue;
        }
        let mut j = i + 1;
        while j < blocks.len() {
            let mergeable = alive[j]
                && blocks[j].label == blocks[i].label
                && should_merge(blocks[i].label, &blocks[i].bbox, &blocks[j].bbox, config)
                && !is_blocked(&blocks, &alive, i, j);

            if mergeable {
                blocks[i].bbox = merge_boxes(&blocks[i].bbox, &blocks[j].bbox);
                alive[j] = false;
                merged_any = true;
                // The grown box may now reach successors it missed.
                j = i + 1;
                continue;
            }
            j += 1;
        }
    }

    let survivors = blocks
        .into_iter()
        .zip(alive)
        .filter_map(|(block, live)| live.then_some(block))
        .collect();
    (survivors, merged_any)
}

/// Merge a flat list of labelled boxes until no further merge applies.
///
/// The result is in scan order.
pub fn merge_labeled(mut blocks: Vec<LabeledBox>, config: &MergeConfig) -> Vec<LabeledBox> {
    loop {
        blocks.sort_by(scan_order);
        let (next, merged_any) = merge_round(blocks, config);
        blocks = next;
        if !merged_any {
            return blocks;
        }
    }
}

/// Merge every label's boxes in place, regrouping the survivors per label in
/// scan order.
pub fn merge_columns(elements: &mut PageElements, config: &MergeConfig) {
    let blocks = elements.flatten();
    if blocks.is_empty() {
        return;
    }
    let before = blocks.len();
    let merged = merge_labeled(blocks, config);
    log::debug!("column merge: {before} -> {} boxes", merged.len());
    elements.regroup(merged);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1)
    }

    fn lb(label: Label, bbox: BoundingBox) -> LabeledBox {
        LabeledBox { label, bbox }
    }

    fn merge(blocks: Vec<LabeledBox>) -> Vec<LabeledBox> {
        merge_labeled(blocks, &MergeConfig::default())
    }

    #[test]
    fn test_merges_horizontal_neighbours() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 10.0, 50.0, 20.0)),
            lb(Label::Paragraph, bb(52.0, 10.0, 90.0, 20.0)),
        ]);
        assert_eq!(out, vec![lb(Label::Paragraph, bb(10.0, 10.0, 90.0, 20.0))]);
    }

    #[test]
    fn test_intervening_title_blocks_merge() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 10.0, 50.0, 20.0)),
            lb(Label::Paragraph, bb(52.0, 10.0, 90.0, 20.0)),
            lb(Label::Title, bb(51.0, 9.0, 51.0, 21.0)),
        ]);
        assert_eq!(out.len(), 3);
        assert!(out.contains(&lb(Label::Paragraph, bb(10.0, 10.0, 50.0, 20.0))));
        assert!(out.contains(&lb(Label::Paragraph, bb(52.0, 10.0, 90.0, 20.0))));
    }

    #[test]
    fn test_inline_formula_across_lines_does_not_block() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(50.0, 100.0, 540.0, 112.0)),
            lb(Label::Formula, bb(300.0, 95.0, 320.0, 130.0)),
            lb(Label::Paragraph, bb(50.0, 114.0, 540.0, 126.0)),
        ]);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&lb(Label::Paragraph, bb(50.0, 100.0, 540.0, 126.0))));
        assert!(out.contains(&lb(Label::Formula, bb(300.0, 95.0, 320.0, 130.0))));
    }

    #[test]
    fn test_box_inside_vertical_gap_blocks_merge() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(50.0, 100.0, 540.0, 110.0)),
            lb(Label::Header, bb(0.0, 111.0, 600.0, 113.0)),
            lb(Label::Paragraph, bb(50.0, 114.0, 540.0, 124.0)),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_separation_needs_the_whole_gap_axis() {
        let corridor = bb(50.0, 10.0, 52.0, 20.0);
        assert!(separates(&bb(51.0, 9.0, 51.0, 21.0), &corridor, Axis::Horizontal));
        assert!(!separates(&bb(40.0, 12.0, 51.0, 18.0), &corridor, Axis::Horizontal));
        assert!(!separates(&bb(51.0, 0.0, 51.0, 10.0), &corridor, Axis::Horizontal));

        let corridor = bb(50.0, 112.0, 540.0, 114.0);
        assert!(separates(&bb(0.0, 112.0, 600.0, 113.0), &corridor, Axis::Vertical));
        assert!(!separates(&bb(300.0, 95.0, 320.0, 130.0), &corridor, Axis::Vertical));
    }

    #[test]
    fn test_distant_boxes_skip_the_blocking_scan() {
        // Far apart on both axes, so the pair is rejected before any
        // separating box is looked for.
        let blocks = vec![
            lb(Label::Paragraph, bb(10.0, 10.0, 50.0, 20.0)),
            lb(Label::Title, bb(10.0, 200.0, 50.0, 210.0)),
            lb(Label::Paragraph, bb(300.0, 400.0, 340.0, 410.0)),
        ];
        let (out, merged_any) = merge_round(blocks.clone(), &MergeConfig::default());
        assert!(!merged_any);
        assert_eq!(out, blocks);
    }

    #[test]
    fn test_block_between_in_scan_order_prevents_merge() {
        // Lines 10 points apart, a title between them in reading order but
        // off to the side of the gap.
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 200.0, 110.0)),
            lb(Label::Title, bb(300.0, 112.0, 400.0, 118.0)),
            lb(Label::Paragraph, bb(10.0, 120.0, 200.0, 130.0)),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_vertical_adjacency_merges_lines() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 200.0, 110.0)),
            lb(Label::Paragraph, bb(10.0, 124.0, 180.0, 134.0)),
            lb(Label::Paragraph, bb(10.0, 148.0, 190.0, 158.0)),
        ]);
        assert_eq!(out, vec![lb(Label::Paragraph, bb(10.0, 100.0, 200.0, 158.0))]);
    }

    #[test]
    fn test_vertical_gap_limit() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 200.0, 110.0)),
            lb(Label::Paragraph, bb(10.0, 126.0, 200.0, 136.0)),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_list_horizontal_gap_is_wider() {
        let list = merge(vec![
            lb(Label::NumberedList, bb(10.0, 100.0, 30.0, 110.0)),
            lb(Label::NumberedList, bb(55.0, 100.0, 200.0, 110.0)),
        ]);
        assert_eq!(list, vec![lb(Label::NumberedList, bb(10.0, 100.0, 200.0, 110.0))]);

        let text = merge(vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 30.0, 110.0)),
            lb(Label::Paragraph, bb(55.0, 100.0, 200.0, 110.0)),
        ]);
        assert_eq!(text.len(), 2);
    }

    #[test]
    fn test_nested_boxes_merge() {
        let out = merge(vec![
            lb(Label::Formula, bb(0.0, 0.0, 100.0, 100.0)),
            lb(Label::Formula, bb(20.0, 20.0, 30.0, 30.0)),
        ]);
        assert_eq!(out, vec![lb(Label::Formula, bb(0.0, 0.0, 100.0, 100.0))]);
    }

    #[test]
    fn test_different_labels_never_merge() {
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 10.0, 50.0, 20.0)),
            lb(Label::Title, bb(10.0, 10.0, 50.0, 20.0)),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_grown_box_reaches_skipped_successor() {
        // The second box only overlaps the first once it has absorbed the
        // third.
        let out = merge(vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 100.0, 110.0)),
            lb(Label::Paragraph, bb(150.0, 100.5, 300.0, 110.0)),
            lb(Label::Paragraph, bb(95.0, 101.0, 160.0, 111.0)),
        ]);
        assert_eq!(out, vec![lb(Label::Paragraph, bb(10.0, 100.0, 300.0, 111.0))]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let input = vec![
            lb(Label::Paragraph, bb(10.0, 100.0, 200.0, 110.0)),
            lb(Label::Title, bb(10.0, 60.0, 200.0, 70.0)),
            lb(Label::Paragraph, bb(10.0, 112.0, 200.0, 122.0)),
            lb(Label::Paragraph, bb(300.0, 100.0, 500.0, 110.0)),
            lb(Label::Picture, bb(210.0, 90.0, 290.0, 140.0)),
            lb(Label::Paragraph, bb(300.0, 115.0, 480.0, 125.0)),
            lb(Label::MarkedList, bb(10.0, 200.0, 20.0, 210.0)),
            lb(Label::MarkedList, bb(40.0, 200.0, 300.0, 210.0)),
        ];
        let once = merge(input);
        let twice = merge(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_columns_regroups_by_label() {
        let mut elements = PageElements::default();
        elements.push(Label::Paragraph, bb(10.0, 120.0, 200.0, 130.0));
        elements.push(Label::Paragraph, bb(10.0, 100.0, 200.0, 110.0));
        elements.push(Label::Title, bb(10.0, 50.0, 200.0, 60.0));
        elements.push(Label::Paragraph, bb(10.0, 500.0, 200.0, 510.0));

        merge_columns(&mut elements, &MergeConfig::default());

        assert_eq!(
            elements.boxes(Label::Paragraph),
            &[bb(10.0, 100.0, 200.0, 130.0), bb(10.0, 500.0, 200.0, 510.0)]
        );
        assert_eq!(elements.boxes(Label::Title), &[bb(10.0, 50.0, 200.0, 60.0)]);
    }

    #[test]
    fn test_merge_never_increases_counts() {
        let mut elements = PageElements::default();
        for k in 0..10 {
            let y = k as f64 * 13.0;
            elements.push(Label::Paragraph, bb(10.0, y, 200.0, y + 10.0));
            elements.push(Label::Footnote, bb(300.0, y * 3.0, 320.0, y * 3.0 + 5.0));
        }
        let before: Vec<usize> = Label::ALL.iter().map(|l| elements.boxes(*l).len()).collect();
        merge_columns(&mut elements, &MergeConfig::default());
        for (label, count) in Label::ALL.iter().zip(before) {
            assert!(elements.boxes(*label).len() <= count);
        }
    }
}
