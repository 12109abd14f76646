//! Core library for pagelabel
//!
//! This crate implements the **Functional Core** of the pagelabel application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The pagelabel project uses a three-crate architecture:
//!
//! - **`pagelabel_core`** (this crate): Pure layout passes with zero I/O
//! - **`pdf`**: Extraction of raw page primitives from PDF documents
//! - **`pagelabel`**: File I/O and orchestration (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate take one page's data and return or mutate that
//! page's data. Nothing is read from or written to disk, and no state survives
//! between pages, so pages can be processed on any thread in any order.
//!
//! # Module Organization
//!
//! The passes run in this order, each mutating the same [`PageElements`]:
//!
//! - [`collector`]: Picture and table regions, and the text primitives outside them
//! - [`classifier`]: One label per text primitive from an ordered rule chain
//! - [`lists`]: Paragraph boxes continuing a list item join the list
//! - [`merge`]: Column-aware merging of same-label blocks
//! - [`refine`]: Bounded re-merging and containment cleanup of formulas and paragraphs
//! - [`footnote`]: Bracketed references tagged as footnotes
//!
//! Supporting modules:
//!
//! - [`geometry`]: Bounding boxes and the overlap, containment, and proximity predicates
//! - [`elements`]: The label set and the per-page box lists, with their JSON form
//! - [`pipeline`]: The passes wired together
//! - [`yolo`]: Normalised label lines for detection-model training
//!
//! # Example Usage
//!
//! ```rust
//! use pagelabel_core::{
//!     extract_elements, BoundingBox, Label, PageMeta, PipelineConfig, RawPage, RawSpan,
//! };
//!
//! let page = RawPage {
//!     width: 600.0,
//!     height: 800.0,
//!     spans: vec![RawSpan {
//!         bbox: BoundingBox::new(50.0, 100.0, 300.0, 112.0),
//!         text: "Рисунок 1 Схема".to_string(),
//!         font: Some("Times".to_string()),
//!         color: None,
//!     }],
//!     ..Default::default()
//! };
//!
//! let elements = extract_elements(&page, PageMeta::default(), &PipelineConfig::default());
//! assert_eq!(elements.boxes(Label::PictureSignature).len(), 1);
//! ```

pub mod classifier;
pub mod collector;
pub mod elements;
pub mod footnote;
pub mod geometry;
pub mod lists;
pub mod merge;
pub mod pipeline;
pub mod refine;
pub mod yolo;

pub use collector::{
    CollectorConfig, Drawing, DrawingKind, ImageRecord, PrimitiveError, RawPage, RawSpan,
    SpanColor, TextPrimitive,
};
pub use elements::{ElementsError, Label, LabeledBox, PageElements, PageMeta};
pub use geometry::{BoundingBox, Proximity};
pub use merge::MergeConfig;
pub use pipeline::{extract_elements, merge_blocks, PipelineConfig};
pub use refine::RefineConfig;
pub use yolo::YoloError;
