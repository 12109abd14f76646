use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

/// An object identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type ObjectId = (u32, u16);

/// A page's object identifier.
pub type PageId = ObjectId;

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Encoding entry from the font dictionary, if present.
    pub encoding: Option<String>,
}

/// What a named XObject of the page resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum XObjectKind {
    Image,
    /// A form XObject with its `/Matrix` (identity when absent).
    Form { id: ObjectId, matrix: [f32; 6] },
    /// Any other subtype (PostScript XObjects, malformed dictionaries).
    Other,
}

/// One entry of the page's `/XObject` resource dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectInfo {
    pub name: Vec<u8>,
    /// `Err` carries the reason the object could not be resolved.
    pub kind: Result<XObjectKind, String>,
}

/// The fonts and XObjects a content stream can name.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub fonts: Vec<BackendFontInfo>,
    pub xobjects: Vec<XObjectInfo>,
}

/// A simplified, lopdf-independent representation of a PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(ObjectId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// All operands as numbers, or `None` if any operand is not numeric.
pub fn numbers(operands: &[PdfValue]) -> Option<Vec<f32>> {
    operands.iter().map(get_number_from_value).collect()
}

/// Convert a `lopdf::Object` into a [`PdfValue`]. Stream bodies are dropped;
/// only their dictionaries survive.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(convert_dict(dict)),
        lopdf::Object::Stream(stream) => PdfValue::Dict(convert_dict(&stream.dict)),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

fn convert_dict(dict: &lopdf::Dictionary) -> Vec<(Vec<u8>, PdfValue)> {
    dict.iter()
        .map(|(k, v)| (k.clone(), convert_object(v)))
        .collect()
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with a BOM is decoded as such, valid UTF-8 is kept, and anything
/// else is read as Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Abstraction over the PDF parsing backend, so the content walkers can be
/// tested against pre-decoded operations.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// The visible page area `[llx, lly, urx, ury]`: the CropBox clipped to
    /// the MediaBox. Both are inherited from the page tree when the page does
    /// not set them.
    fn page_box(&self, page: PageId) -> Result<[f32; 4], PdfError>;

    /// Clockwise display rotation in degrees: 0, 90, 180 or 270.
    fn page_rotation(&self, page: PageId) -> Result<u16, PdfError>;

    /// Return font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Every entry of the page's XObject resources.
    fn page_xobjects(&self, page: PageId) -> Result<Vec<XObjectInfo>, PdfError>;

    /// Return the raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Return the decompressed content stream of a form XObject.
    fn form_content(&self, form: ObjectId) -> Result<Vec<u8>, PdfError>;

    /// The form's own resources, or `None` when it uses those of the stream
    /// that draws it.
    fn form_resources(&self, form: ObjectId) -> Result<Option<Resources>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a text-showing operand for the given font.
    fn decode_text(&self, font: Option<&BackendFontInfo>, bytes: &[u8]) -> String;
}

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn page_dict(&self, page: PageId) -> Result<&lopdf::Dictionary, PdfError> {
        self.doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot get page dictionary: {}", e)))
    }

    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        self.resolve(obj).as_dict().ok()
    }

    /// Look up a page attribute, walking up through `/Parent` nodes.
    fn inherited<'a>(&'a self, dict: &'a lopdf::Dictionary, key: &[u8]) -> Option<&'a lopdf::Object> {
        if let Ok(obj) = dict.get(key) {
            return Some(self.resolve(obj));
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.inherited(parent_dict, key)
    }

    fn array_to_f32s(&self, objects: &[lopdf::Object]) -> Result<Vec<f32>, PdfError> {
        objects
            .iter()
            .map(|obj| match self.resolve(obj) {
                lopdf::Object::Integer(i) => Ok(*i as f32),
                lopdf::Object::Real(f) => Ok(*f),
                other => Err(PdfError::Parse(format!(
                    "expected number in array, got {:?}",
                    other
                ))),
            })
            .collect()
    }

    fn numeric_array(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<Vec<f32>> {
        let arr = self.resolve(dict.get(key).ok()?).as_array().ok()?;
        self.array_to_f32s(arr).ok()
    }

    fn classify_xobject(&self, obj: &lopdf::Object) -> Result<XObjectKind, String> {
        let (id, resolved) = match obj {
            lopdf::Object::Reference(id) => {
                (Some(*id), self.doc.get_object(*id).map_err(|e| e.to_string())?)
            }
            other => (None, other),
        };
        let stream = resolved
            .as_stream()
            .map_err(|_| "XObject is not a stream".to_string())?;

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok());

        Ok(match subtype {
            Some(b"Image") => XObjectKind::Image,
            Some(b"Form") => {
                let id = id.ok_or_else(|| "form XObject is not an indirect object".to_string())?;
                let matrix = self
                    .numeric_array(&stream.dict, b"Matrix")
                    .filter(|v| v.len() == 6)
                    .unwrap_or_else(|| vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
                XObjectKind::Form {
                    id,
                    matrix: [matrix[0], matrix[1], matrix[2], matrix[3], matrix[4], matrix[5]],
                }
            }
            _ => XObjectKind::Other,
        })
    }

    fn font_info(name: &[u8], dict: &lopdf::Dictionary) -> BackendFontInfo {
        let name_of = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
        };
        BackendFontInfo {
            name: name.to_vec(),
            base_font: name_of(b"BaseFont"),
            encoding: name_of(b"Encoding"),
        }
    }

    fn xobjects_in(&self, resources: &lopdf::Dictionary) -> Vec<XObjectInfo> {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .map(|(name, obj)| XObjectInfo {
                name: name.clone(),
                kind: self.classify_xobject(obj),
            })
            .collect()
    }

    fn fonts_in(&self, resources: &lopdf::Dictionary) -> Vec<BackendFontInfo> {
        let Some(fonts) = resources.get(b"Font").ok().and_then(|obj| self.resolve_dict(obj)) else {
            return Vec::new();
        };

        fonts
            .iter()
            .filter_map(|(name, obj)| Some(Self::font_info(name, self.resolve_dict(obj)?)))
            .collect()
    }

    fn form_stream(&self, form: ObjectId) -> Result<&lopdf::Stream, PdfError> {
        self.doc
            .get_object(form)
            .and_then(|obj| obj.as_stream())
            .map_err(|e| PdfError::Parse(format!("cannot get form XObject {form:?}: {e}")))
    }

    /// A `[llx, lly, urx, ury]` page attribute with its corners normalised.
    fn page_rect(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Result<Option<[f32; 4]>, PdfError> {
        let Some(array) = self.inherited(dict, key).and_then(|obj| obj.as_array().ok()) else {
            return Ok(None);
        };

        let nums = self.array_to_f32s(array)?;
        if nums.len() < 4 {
            return Err(PdfError::Parse(format!(
                "{} has {} elements, expected 4",
                String::from_utf8_lossy(key),
                nums.len()
            )));
        }
        Ok(Some([
            nums[0].min(nums[2]),
            nums[1].min(nums[3]),
            nums[0].max(nums[2]),
            nums[1].max(nums[3]),
        ]))
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> Result<[f32; 4], PdfError> {
        let dict = self.page_dict(page)?;
        let media = self
            .page_rect(dict, b"MediaBox")?
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;
        let Some(crop) = self.page_rect(dict, b"CropBox")? else {
            return Ok(media);
        };

        let clipped = [
            crop[0].max(media[0]),
            crop[1].max(media[1]),
            crop[2].min(media[2]),
            crop[3].min(media[3]),
        ];
        if clipped[0] >= clipped[2] || clipped[1] >= clipped[3] {
            log::warn!("page {page:?}: CropBox {crop:?} lies outside MediaBox {media:?}, using MediaBox");
            return Ok(media);
        }
        Ok(clipped)
    }

    fn page_rotation(&self, page: PageId) -> Result<u16, PdfError> {
        let dict = self.page_dict(page)?;
        let rotate = match self.inherited(dict, b"Rotate") {
            None => return Ok(0),
            Some(lopdf::Object::Integer(r)) => *r,
            Some(other) => {
                log::warn!("page {page:?}: /Rotate is not an integer ({other:?}), ignored");
                return Ok(0);
            }
        };

        let normalized = rotate.rem_euclid(360);
        if normalized % 90 != 0 {
            log::warn!("page {page:?}: /Rotate {rotate} is not a multiple of 90, ignored");
            return Ok(0);
        }
        Ok(normalized as u16)
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| Self::font_info(name, dict))
            .collect())
    }

    fn page_xobjects(&self, page: PageId) -> Result<Vec<XObjectInfo>, PdfError> {
        let dict = self.page_dict(page)?;
        Ok(self
            .inherited(dict, b"Resources")
            .and_then(|res| res.as_dict().ok())
            .map(|res| self.xobjects_in(res))
            .unwrap_or_default())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn form_content(&self, form: ObjectId) -> Result<Vec<u8>, PdfError> {
        let stream = self.form_stream(form)?;
        if stream.dict.get(b"Filter").is_ok() {
            stream
                .decompressed_content()
                .map_err(|e| PdfError::Parse(format!("cannot decompress form XObject {form:?}: {e}")))
        } else {
            Ok(stream.content.clone())
        }
    }

    fn form_resources(&self, form: ObjectId) -> Result<Option<Resources>, PdfError> {
        let stream = self.form_stream(form)?;
        let Some(resources) = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return Ok(None);
        };

        Ok(Some(Resources {
            fonts: self.fonts_in(resources),
            xobjects: self.xobjects_in(resources),
        }))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, font: Option<&BackendFontInfo>, bytes: &[u8]) -> String {
        // Identity-H / Identity-V fonts typically use 2-byte CID codes that
        // map to Unicode.
        if let Some(enc_name) = font.and_then(|f| f.encoding.as_deref()) {
            if enc_name.contains("Identity") && bytes.len() >= 2 && bytes.len() % 2 == 0 {
                let code_units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let decoded = String::from_utf16_lossy(&code_units);
                if !decoded.is_empty() && !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                    return decoded;
                }
            }
        }

        decode_text_simple(bytes)
    }
}
