//! Folding list-item text into the list that owns it.
//!
//! A list marker (`1.` or a bullet glyph) is usually its own span, with the
//! item text in a separate span to its right. Paragraph boxes sitting on the
//! same line to the right of a list box are moved into that list.

use crate::elements::{Label, PageElements};
use crate::geometry::BoundingBox;

/// True when `paragraph` shares vertical extent with `item` and starts
/// strictly to the right of it.
fn continues_item(paragraph: &BoundingBox, item: &BoundingBox) -> bool {
    let vertical_overlap = !(paragraph.y1 < item.y0 || paragraph.y0 > item.y1);
    vertical_overlap && paragraph.x0 > item.x1
}

/// Reclassify paragraphs that continue a numbered or marked list item.
///
/// Numbered lists are consulted before marked lists. The list boxes matched
/// against are those present before the pass; adopted paragraphs are appended
/// to their list but are not themselves used as anchors.
pub fn adopt_list_continuations(elements: &mut PageElements) {
    let numbered = elements.boxes(Label::NumberedList).to_vec();
    let marked = elements.boxes(Label::MarkedList).to_vec();
    let paragraphs = elements.take(Label::Paragraph);

    let mut adopted = 0usize;
    for paragraph in paragraphs {
        let owner = [(Label::NumberedList, &numbered), (Label::MarkedList, &marked)]
            .into_iter()
            .find(|(_, items)| items.iter().any(|item| continues_item(&paragraph, item)))
            .map(|(label, _)| label);

        match owner {
            Some(label) => {
                elements.push(label, paragraph);
                adopted += 1;
            }
            None => elements.push(Label::Paragraph, paragraph),
        }
    }

    log::debug!("adopted {adopted} paragraph boxes into lists");
}
