//! Rule-chain classification of text primitives.
//!
//! Each primitive gets exactly one label from the first matching rule in
//! [`RULES`]. The only state carried between primitives is whether the page
//! has announced its endnote section; classification is a fold of
//! [`classify`] over the primitives in ascending `y` order.

use std::sync::OnceLock;

use regex::Regex;

use crate::collector::TextPrimitive;
use crate::elements::{Label, PageElements};

/// Fraction of the page height covered by each of the header and footer bands.
pub const DEFAULT_BAND_RATIO: f64 = 0.085;

/// Heading text after which every later span is an endnote list entry.
pub const ENDNOTE_HEADING: &str = "Концевые сноски";

/// Font name marking formula spans.
pub const FORMULA_FONT: &str = "cambria math";

/// Bullet glyph from the Symbol font's private-use area.
pub const BULLET_GLYPH: &str = "\u{f0b7}";

/// Header and footer bands of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBands {
    pub page_height: f64,
    /// Spans whose top is at or above this are headers.
    pub header_limit: f64,
    /// Spans whose top is at or below this are footers.
    pub footer_limit: f64,
}

impl PageBands {
    pub fn new(page_height: f64, band_ratio: f64) -> Self {
        let band = band_ratio * page_height;
        Self {
            page_height,
            header_limit: band,
            footer_limit: page_height - band,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierState {
    pub endnote_announced: bool,
}

/// One entry of the ordered rule chain.
pub struct Rule {
    pub name: &'static str,
    pub label: Label,
    pub matches: fn(&PageBands, ClassifierState, &TextPrimitive) -> bool,
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.").unwrap())
}

fn table_caption_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(Табл\.\s+\d+\.\s|Таблица\s+\d+\s-\s|Таблица\.)").unwrap()
    })
}

fn picture_caption_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(Рис\.|Рисунок)\s+\d+").unwrap())
}

/// The rule chain, evaluated top to bottom. Order is significant: the page
/// bands pre-empt every content rule, and boldness pre-empts the picture
/// caption pattern.
pub static RULES: [Rule; 9] = [
    Rule {
        name: "footer band",
        label: Label::Footer,
        matches: |bands, _, p| p.y() >= bands.footer_limit,
    },
    Rule {
        name: "header band",
        label: Label::Header,
        matches: |bands, _, p| p.y() <= bands.header_limit,
    },
    Rule {
        name: "endnote section",
        label: Label::NumberedList,
        matches: |_, state, _| state.endnote_announced,
    },
    Rule {
        name: "formula font",
        label: Label::Formula,
        matches: |_, _, p| p.font == FORMULA_FONT,
    },
    Rule {
        name: "bullet glyph",
        label: Label::MarkedList,
        matches: |_, _, p| p.text == BULLET_GLYPH,
    },
    Rule {
        name: "numbered item",
        label: Label::NumberedList,
        matches: |_, _, p| numbered_re().is_match(&p.text),
    },
    Rule {
        name: "table caption",
        label: Label::TableSignature,
        matches: |_, _, p| table_caption_re().is_match(&p.text),
    },
    Rule {
        name: "bold",
        label: Label::Title,
        matches: |_, _, p| p.is_bold,
    },
    Rule {
        name: "picture caption",
        label: Label::PictureSignature,
        matches: |_, _, p| picture_caption_re().is_match(&p.text),
    },
];

/// Classify one primitive and advance the carried state.
pub fn classify(
    bands: &PageBands,
    state: ClassifierState,
    primitive: &TextPrimitive,
) -> (ClassifierState, Label) {
    let label = RULES
        .iter()
        .find(|rule| (rule.matches)(bands, state, primitive))
        .map(|rule| rule.label)
        .unwrap_or(Label::Paragraph);

    let next = ClassifierState {
        endnote_announced: state.endnote_announced || primitive.text == ENDNOTE_HEADING,
    };

    (next, label)
}

/// Sort primitives by their top edge and append each one's box to the list of
/// its label. Returns the sorted primitives.
pub fn classify_page(
    elements: &mut PageElements,
    mut primitives: Vec<TextPrimitive>,
    bands: &PageBands,
) -> Vec<TextPrimitive> {
    primitives.sort_by(|a, b| a.y().total_cmp(&b.y()));

    primitives
        .iter()
        .fold(ClassifierState::default(), |state, primitive| {
            let (next, label) = classify(bands, state, primitive);
            elements.push(label, primitive.bbox);
            next
        });

    primitives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    const HEIGHT: f64 = 1000.0;

    fn bands() -> PageBands {
        PageBands::new(HEIGHT, DEFAULT_BAND_RATIO)
    }

    fn prim_at(text: &str, y: f64) -> TextPrimitive {
        TextPrimitive::new(BoundingBox::new(50.0, y, 300.0, y + 12.0), text)
    }

    fn label_of(p: &TextPrimitive) -> Label {
        classify(&bands(), ClassifierState::default(), p).1
    }

    #[test]
    fn test_bands() {
        let b = bands();
        assert_eq!(b.header_limit, 85.0);
        assert_eq!(b.footer_limit, 915.0);
    }

    #[test]
    fn test_header_wins_over_bold_and_captions() {
        let mut p = prim_at("Рисунок 3 Схема", 0.01 * HEIGHT);
        p.is_bold = true;
        assert_eq!(label_of(&p), Label::Header);

        let p = prim_at("Таблица. Итоги", 85.0);
        assert_eq!(label_of(&p), Label::Header);
    }

    #[test]
    fn test_footer_band() {
        assert_eq!(label_of(&prim_at("12", 915.0)), Label::Footer);
        assert_eq!(label_of(&prim_at("12", 914.0)), Label::Paragraph);
    }

    #[test]
    fn test_formula_font_beats_list_and_bold() {
        let mut p = prim_at("1. x + y", 300.0);
        p.font = "cambria math".to_string();
        p.is_bold = true;
        assert_eq!(label_of(&p), Label::Formula);
    }

    #[test]
    fn test_bullet_glyph() {
        assert_eq!(label_of(&prim_at("\u{f0b7}", 300.0)), Label::MarkedList);
        assert_eq!(label_of(&prim_at("\u{f0b7} item", 300.0)), Label::Paragraph);
    }

    #[test]
    fn test_numbered_item() {
        assert_eq!(label_of(&prim_at("12. Введение", 300.0)), Label::NumberedList);
        assert_eq!(label_of(&prim_at("12 Введение", 300.0)), Label::Paragraph);
    }

    #[test]
    fn test_table_captions() {
        assert_eq!(label_of(&prim_at("Табл. 2. Данные", 300.0)), Label::TableSignature);
        assert_eq!(label_of(&prim_at("Таблица 4 - Итоги", 300.0)), Label::TableSignature);
        assert_eq!(label_of(&prim_at("Таблица. Итоги", 300.0)), Label::TableSignature);
        assert_eq!(label_of(&prim_at("Таблица 4 итоги", 300.0)), Label::Paragraph);
    }

    #[test]
    fn test_table_caption_beats_bold() {
        let mut p = prim_at("Таблица 1 - Результаты", 300.0);
        p.is_bold = true;
        assert_eq!(label_of(&p), Label::TableSignature);
    }

    #[test]
    fn test_bold_beats_picture_caption() {
        let mut p = prim_at("Рисунок 1 Схема", 300.0);
        assert_eq!(label_of(&p), Label::PictureSignature);
        p.is_bold = true;
        assert_eq!(label_of(&p), Label::Title);
        assert_eq!(label_of(&prim_at("Рис. 7", 300.0)), Label::PictureSignature);
    }

    #[test]
    fn test_endnote_announcement_carries_over() {
        let mut elements = PageElements::default();
        let mut bold = prim_at("Заключение", 400.0);
        bold.is_bold = true;
        let mut formula = prim_at("E = mc2", 420.0);
        formula.font = "cambria math".to_string();

        let prims = vec![
            prim_at("Текст до сносок", 200.0),
            prim_at(ENDNOTE_HEADING, 300.0),
            bold,
            formula,
            prim_at("Рисунок 2 Итог", 440.0),
            prim_at("колонтитул", 950.0),
        ];
        classify_page(&mut elements, prims, &bands());

        assert_eq!(elements.boxes(Label::Paragraph).len(), 2);
        assert_eq!(elements.boxes(Label::NumberedList).len(), 3);
        assert_eq!(elements.boxes(Label::Footer).len(), 1);
        assert!(elements.boxes(Label::Title).is_empty());
        assert!(elements.boxes(Label::Formula).is_empty());
    }

    #[test]
    fn test_classify_page_sorts_by_y() {
        let mut elements = PageElements::default();
        let prims = vec![prim_at("b", 500.0), prim_at("a", 100.0), prim_at("c", 300.0)];
        let sorted = classify_page(&mut elements, prims, &bands());
        let texts: Vec<&str> = sorted.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "b"]);
        let ys: Vec<f64> = elements.boxes(Label::Paragraph).iter().map(|b| b.y0).collect();
        assert_eq!(ys, vec![100.0, 300.0, 500.0]);
    }
}
