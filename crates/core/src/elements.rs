//! The per-page label → boxes artifact and its JSON shape.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geometry::BoundingBox;

/// One of the fixed semantic classes a region can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Title,
    Paragraph,
    Table,
    Picture,
    TableSignature,
    PictureSignature,
    NumberedList,
    MarkedList,
    Header,
    Footer,
    Footnote,
    Formula,
}

impl Label {
    /// Every label, in class-id order.
    pub const ALL: [Label; 12] = [
        Label::Title,
        Label::Paragraph,
        Label::Table,
        Label::Picture,
        Label::TableSignature,
        Label::PictureSignature,
        Label::NumberedList,
        Label::MarkedList,
        Label::Header,
        Label::Footer,
        Label::Footnote,
        Label::Formula,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Title => "title",
            Label::Paragraph => "paragraph",
            Label::Table => "table",
            Label::Picture => "picture",
            Label::TableSignature => "table_signature",
            Label::PictureSignature => "picture_signature",
            Label::NumberedList => "numbered_list",
            Label::MarkedList => "marked_list",
            Label::Header => "header",
            Label::Footer => "footer",
            Label::Footnote => "footnote",
            Label::Formula => "formula",
        }
    }

    /// Detection-model class index.
    pub fn class_id(&self) -> usize {
        *self as usize
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Label::NumberedList | Label::MarkedList)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// A box tagged with its label, the unit the merger works on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledBox {
    pub label: Label,
    pub bbox: BoundingBox,
}

/// Page image metadata carried alongside the boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub image_width: f64,
    pub image_height: f64,
    pub image_path: String,
}

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("Page elements must be a JSON object, got {0}")]
    NotAMapping(&'static str),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every label's boxes for one page, plus the page image metadata.
///
/// Boxes keep insertion order; no pass sorts a list in place except the
/// column merger, which regroups in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageElements {
    boxes: [Vec<BoundingBox>; 12],
    pub meta: PageMeta,
}

const META_KEYS: [&str; 3] = ["image_width", "image_height", "image_path"];

impl PageElements {
    pub fn new(meta: PageMeta) -> Self {
        Self {
            boxes: Default::default(),
            meta,
        }
    }

    pub fn boxes(&self, label: Label) -> &[BoundingBox] {
        &self.boxes[label.class_id()]
    }

    pub fn boxes_mut(&mut self, label: Label) -> &mut Vec<BoundingBox> {
        &mut self.boxes[label.class_id()]
    }

    pub fn push(&mut self, label: Label, bbox: BoundingBox) {
        self.boxes_mut(label).push(bbox);
    }

    /// Remove and return every box of `label`, leaving its list empty.
    pub fn take(&mut self, label: Label) -> Vec<BoundingBox> {
        std::mem::take(self.boxes_mut(label))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, &[BoundingBox])> {
        Label::ALL
            .into_iter()
            .map(move |label| (label, self.boxes(label)))
    }

    /// Total number of boxes across all labels.
    pub fn total(&self) -> usize {
        self.boxes.iter().map(Vec::len).sum()
    }

    /// All boxes as `(label, bbox)` pairs, label by label.
    pub fn flatten(&self) -> Vec<LabeledBox> {
        self.iter()
            .flat_map(|(label, boxes)| boxes.iter().map(move |&bbox| LabeledBox { label, bbox }))
            .collect()
    }

    /// Replace every list with the given boxes, keeping their relative order.
    pub fn regroup(&mut self, blocks: impl IntoIterator<Item = LabeledBox>) {
        for list in self.boxes.iter_mut() {
            list.clear();
        }
        for block in blocks {
            self.push(block.label, block.bbox);
        }
    }

    /// Build page elements from an arbitrary JSON value.
    ///
    /// A non-object value is rejected. Inside the object, label entries that
    /// are not arrays and boxes that are not four-number arrays are skipped;
    /// keys that are neither labels nor metadata are ignored.
    pub fn from_json_value(value: Value) -> Result<Self, ElementsError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(ElementsError::NotAMapping(json_kind(&other))),
        };

        let mut elements = PageElements::new(read_meta(&map));

        for (key, value) in &map {
            let Ok(label) = key.parse::<Label>() else {
                if !META_KEYS.contains(&key.as_str()) {
                    log::trace!("ignoring unknown key {key:?}");
                }
                continue;
            };
            let Value::Array(items) = value else {
                log::trace!("skipping non-array value under {label}");
                continue;
            };
            for item in items {
                match parse_box(item) {
                    Some(bbox) => elements.push(label, bbox),
                    None => log::trace!("skipping malformed {label} box {item}"),
                }
            }
        }

        Ok(elements)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ElementsError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json_value(value)
    }
}

fn read_meta(map: &Map<String, Value>) -> PageMeta {
    PageMeta {
        image_width: map.get("image_width").and_then(Value::as_f64).unwrap_or(0.0),
        image_height: map.get("image_height").and_then(Value::as_f64).unwrap_or(0.0),
        image_path: map
            .get("image_path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn parse_box(value: &Value) -> Option<BoundingBox> {
    let items = value.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut coords = [0.0; 4];
    for (slot, item) in coords.iter_mut().zip(items) {
        *slot = item.as_f64()?;
    }
    Some(BoundingBox::from(coords))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for PageElements {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Label::ALL.len() + META_KEYS.len()))?;
        for (label, boxes) in self.iter() {
            map.serialize_entry(label.as_str(), boxes)?;
        }
        map.serialize_entry("image_width", &self.meta.image_width)?;
        map.serialize_entry("image_height", &self.meta.image_height)?;
        map.serialize_entry("image_path", &self.meta.image_path)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PageElements {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PageElements::from_json_value(value).map_err(D::Error::custom)
    }
}
