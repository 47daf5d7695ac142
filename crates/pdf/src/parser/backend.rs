use std::collections::BTreeMap;

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Page size assumed when a page has no usable MediaBox (US letter).
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A simplified, lopdf-independent representation of a PDF value.
///
/// The word extractor only ever sees this type, so it can be driven by a
/// mock backend in tests.
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
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with BOM first, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // PDFDocEncoding agrees with Latin-1 over the printable range.
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// Word extraction only talks to this trait, which keeps the content-stream
/// state machine testable without real PDF bytes.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode raw string bytes found in a text-showing operator, using any
    /// font-specific encoding information the backend can find.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Page `(width, height)` in points.
    fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

#[cfg(feature = "lopdf")]
pub use self::lopdf_backend::{convert_object, LopdfBackend};

#[cfg(feature = "lopdf")]
mod lopdf_backend {
    use std::collections::BTreeMap;

    use lopdf::content::Content;

    use super::{decode_text_simple, ContentOp, PageId, PdfBackend, PdfValue};
    use crate::PdfError;

    /// Convert a `lopdf::Object` into a [`PdfValue`].
    ///
    /// Stream dictionaries are converted but their bytes are dropped; page
    /// content goes through [`PdfBackend::page_content`].
    pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
        match obj {
            lopdf::Object::Null => PdfValue::Null,
            lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
            lopdf::Object::Integer(i) => PdfValue::Integer(*i),
            lopdf::Object::Real(f) => PdfValue::Real(*f),
            lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
            lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
            lopdf::Object::Array(arr) => {
                PdfValue::Array(arr.iter().map(convert_object).collect())
            }
            lopdf::Object::Dictionary(dict) => PdfValue::Dict(
                dict.iter()
                    .map(|(k, v)| (k.clone(), convert_object(v)))
                    .collect(),
            ),
            lopdf::Object::Stream(stream) => PdfValue::Dict(
                stream
                    .dict
                    .iter()
                    .map(|(k, v)| (k.clone(), convert_object(v)))
                    .collect(),
            ),
            lopdf::Object::Reference(id) => PdfValue::Reference(*id),
        }
    }

    /// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
    pub struct LopdfBackend {
        doc: lopdf::Document,
    }

    impl LopdfBackend {
        /// Parse a PDF from an in-memory byte slice.
        pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
            let doc =
                lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

            if doc.is_encrypted() {
                return Err(PdfError::Encrypted);
            }

            Ok(Self { doc })
        }

        /// Linear text of the whole document, page after page.
        pub fn extract_text(&self) -> Result<String, PdfError> {
            let page_numbers: Vec<u32> = self.doc.get_pages().keys().copied().collect();
            self.extract_pages_text(&page_numbers)
        }

        /// Linear text of the given 1-based pages.
        pub fn extract_pages_text(&self, page_numbers: &[u32]) -> Result<String, PdfError> {
            self.doc
                .extract_text(page_numbers)
                .map_err(|e| PdfError::Parse(format!("text extraction failed: {}", e)))
        }

        /// Walk up the page tree to find the MediaBox array.
        fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<lopdf::Object>> {
            if let Ok(obj) = dict.get(b"MediaBox") {
                if let Some(arr) = self.resolve_array(obj) {
                    return Some(arr);
                }
            }

            let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
            let parent_dict = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
            self.find_media_box(parent_dict)
        }

        /// Resolve an object to an array, following a single level of indirection.
        fn resolve_array(&self, obj: &lopdf::Object) -> Option<Vec<lopdf::Object>> {
            match obj {
                lopdf::Object::Array(arr) => Some(arr.clone()),
                lopdf::Object::Reference(id) => {
                    self.doc.get_object(*id).ok()?.as_array().ok().cloned()
                }
                _ => None,
            }
        }

        fn number(&self, obj: &lopdf::Object) -> Result<f32, PdfError> {
            let resolved = match obj {
                lopdf::Object::Reference(id) => self
                    .doc
                    .get_object(*id)
                    .map_err(|e| PdfError::Parse(e.to_string()))?,
                other => other,
            };
            match resolved {
                lopdf::Object::Integer(i) => Ok(*i as f32),
                lopdf::Object::Real(f) => Ok(*f),
                _ => Err(PdfError::Parse(format!(
                    "expected number in MediaBox, got {:?}",
                    resolved
                ))),
            }
        }

        fn font_encoding_name(&self, page: PageId, font_name: &[u8]) -> Option<String> {
            let fonts = self.doc.get_page_fonts(page).ok()?;
            let font_dict = fonts.get(font_name)?;
            match font_dict.get(b"Encoding").ok()? {
                lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            }
        }
    }

    impl PdfBackend for LopdfBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            self.doc.get_pages()
        }

        fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
            self.doc
                .get_page_content(page)
                .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
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

        fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
            // Identity-H / Identity-V fonts usually carry 2-byte codes that
            // map straight to Unicode.
            let identity = self
                .font_encoding_name(page, font_name)
                .is_some_and(|enc| enc.contains("Identity"));
            if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
                let code_units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let decoded = String::from_utf16_lossy(&code_units);
                if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                    return decoded;
                }
            }

            decode_text_simple(bytes)
        }

        fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError> {
            let page_dict = self
                .doc
                .get_object(page)
                .and_then(|obj| obj.as_dict())
                .map_err(|e| PdfError::Parse(format!("cannot get page dictionary: {}", e)))?;

            let media_box = self
                .find_media_box(page_dict)
                .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

            if media_box.len() < 4 {
                return Err(PdfError::Parse(format!(
                    "MediaBox has {} elements, expected 4",
                    media_box.len()
                )));
            }

            let llx = self.number(&media_box[0])?;
            let lly = self.number(&media_box[1])?;
            let urx = self.number(&media_box[2])?;
            let ury = self.number(&media_box[3])?;
            Ok(((urx - llx).abs(), (ury - lly).abs()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
