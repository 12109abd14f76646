//! Bounded greedy refinement of formula and paragraph boxes.
//!
//! Formulas fragment along baselines and operators, so they are merged by
//! proximity for up to four rounds. Paragraph fragments are merged only when
//! they overlap, for two rounds. Both lists are then cleaned of exact
//! duplicates and of boxes contained in another box of the same list.

use crate::elements::{Label, PageElements};
use crate::geometry::{are_bboxes_close, do_overlap, is_inside, merge_boxes, BoundingBox, Proximity};

#[derive(Debug, Clone, PartialEq)]
pub struct RefineConfig {
    pub formula_rounds: usize,
    pub paragraph_rounds: usize,
    pub proximity: Proximity,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            formula_rounds: 4,
            paragraph_rounds: 2,
            proximity: Proximity::default(),
        }
    }
}

/// One greedy pass: each unused box merges with the first later unused box
/// the predicate accepts; both are then spent for the rest of the round.
fn greedy_round<F>(boxes: &[BoundingBox], joinable: &F) -> (Vec<BoundingBox>, bool)
where
    F: Fn(&BoundingBox, &BoundingBox) -> bool,
{
    let mut used = vec![false; boxes.len()];
    let mut out = Vec::with_capacity(boxes.len());
    let mut merged_any = false;

    for i in 0..boxes.len() {
        if used[i] {
            continue;
        }
        let partner = (i + 1..boxes.len()).find(|&j| !used[j] && joinable(&boxes[i], &boxes[j]));
        match partner {
            Some(j) => {
                out.push(merge_boxes(&boxes[i], &boxes[j]));
                used[i] = true;
                used[j] = true;
                merged_any = true;
            }
            None => out.push(boxes[i]),
        }
    }

    (out, merged_any)
}

/// Run up to `rounds` greedy rounds, each consuming the previous round's
/// output, stopping early once a round merges nothing.
pub fn converge<F>(mut boxes: Vec<BoundingBox>, rounds: usize, joinable: F) -> Vec<BoundingBox>
where
    F: Fn(&BoundingBox, &BoundingBox) -> bool,
{
    for _ in 0..rounds.min(boxes.len()) {
        let (next, merged_any) = greedy_round(&boxes, &joinable);
        boxes = next;
        if !merged_any {
            break;
        }
    }
    boxes
}

/// Drop exact duplicates, keeping the first occurrence.
pub fn dedup_exact(boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
    let mut out: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for bbox in boxes {
        if !out.contains(&bbox) {
            out.push(bbox);
        }
    }
    out
}

/// Drop every box lying inside another box of the list.
pub fn prune_contained(boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
    boxes
        .iter()
        .enumerate()
        .filter(|(i, inner)| {
            !boxes
                .iter()
                .enumerate()
                .any(|(j, outer)| *i != j && is_inside(inner, outer, 0.0))
        })
        .map(|(_, bbox)| *bbox)
        .collect()
}

fn refine_list<F>(elements: &mut PageElements, label: Label, rounds: usize, joinable: F)
where
    F: Fn(&BoundingBox, &BoundingBox) -> bool,
{
    let boxes = elements.take(label);
    if boxes.is_empty() {
        return;
    }
    let before = boxes.len();
    let refined = prune_contained(dedup_exact(converge(boxes, rounds, joinable)));
    log::debug!("refined {label}: {before} -> {} boxes", refined.len());
    *elements.boxes_mut(label) = refined;
}

/// Refine the formula and paragraph lists in place.
pub fn refine(elements: &mut PageElements, config: &RefineConfig) {
    let proximity = config.proximity;
    refine_list(elements, Label::Formula, config.formula_rounds, |a, b| {
        are_bboxes_close(a, b, &proximity)
    });
    refine_list(elements, Label::Paragraph, config.paragraph_rounds, do_overlap);
}
