//! The per-page pass sequence.
//!
//! ```text
//! RawPage ─► collect ─► classify ─► adopt lists ─► merge columns ─► refine ─► tag footnotes
//! ```
//!
//! Each page is processed independently and nothing is carried across pages,
//! so callers may run pages on separate threads.

use crate::classifier::{classify_page, PageBands, DEFAULT_BAND_RATIO};
use crate::collector::{collect, CollectorConfig, RawPage};
use crate::elements::{PageElements, PageMeta};
use crate::footnote::tag_footnotes;
use crate::lists::adopt_list_continuations;
use crate::merge::{merge_columns, MergeConfig};
use crate::refine::{refine, RefineConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub collector: CollectorConfig,
    /// Height of each of the header and footer bands, as a fraction of the
    /// page height.
    pub header_band_ratio: f64,
    pub merge: MergeConfig,
    pub refine: RefineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            header_band_ratio: DEFAULT_BAND_RATIO,
            merge: MergeConfig::default(),
            refine: RefineConfig::default(),
        }
    }
}

/// Turn one page's raw primitives into labelled, merged boxes.
///
/// Boxes keep the source coordinates and are not clipped to the page.
pub fn extract_elements(page: &RawPage, meta: PageMeta, config: &PipelineConfig) -> PageElements {
    let (mut elements, primitives) = collect(page, meta, &config.collector);

    let bands = PageBands::new(page.height, config.header_band_ratio);
    let primitives = classify_page(&mut elements, primitives, &bands);

    adopt_list_continuations(&mut elements);
    merge_blocks(&mut elements, config);
    tag_footnotes(&mut elements, &primitives);

    log::debug!("page yields {} boxes", elements.total());
    elements
}

/// Column merge followed by refinement, for boxes that were already
/// classified (for example annotations loaded from disk).
pub fn merge_blocks(elements: &mut PageElements, config: &PipelineConfig) {
    merge_columns(elements, &config.merge);
    refine(elements, &config.refine);
}
