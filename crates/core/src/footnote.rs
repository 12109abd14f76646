//! Footnote references such as `[3]`.

use crate::collector::TextPrimitive;
use crate::elements::{Label, PageElements};

/// True when the text opens with `[` and closes with `]`.
pub fn is_footnote_marker(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('[') && text.ends_with(']')
}

/// Append the box of every bracketed primitive to the footnote list,
/// whatever label it already carries. Boxes are not deduplicated.
pub fn tag_footnotes(elements: &mut PageElements, primitives: &[TextPrimitive]) {
    let mut tagged = 0usize;
    for primitive in primitives.iter().filter(|p| is_footnote_marker(&p.text)) {
        elements.push(Label::Footnote, primitive.bbox);
        tagged += 1;
    }
    log::debug!("tagged {tagged} footnote markers");
}
