//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the PDF objects the content
//! interpreter needs, isolating the concrete PDF library (lopdf) from
//! snapshot construction.

use std::collections::BTreeMap;

use crate::detect::sniff_bytes;
use crate::error::{Error, Result};
use crate::model::{NativeImageFormat, Rect};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// FontDescriptor flag bits.
const FLAG_FIXED_PITCH: i64 = 1;
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

/// Bold threshold for /FontWeight.
const BOLD_WEIGHT: f32 = 700.0;

/// Glyph advance used when a font carries no width table (1/1000 em).
pub const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Font metrics and descriptor hints returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name with any subset prefix removed (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph advances in 1/1000 em, indexed from `first_char`.
    pub widths: Vec<f32>,
    /// Explicit CID widths for composite fonts.
    pub cid_widths: BTreeMap<u32, f32>,
    /// Advance for codes outside the width tables.
    pub default_width: f32,
    /// Composite (Type0) font using two-byte codes.
    pub two_byte: bool,
    /// FontDescriptor says FixedPitch.
    pub fixed_pitch: bool,
    /// FontDescriptor says Italic.
    pub italic: bool,
    /// FontDescriptor says ForceBold or weight ≥ 700.
    pub force_bold: bool,
}

impl BackendFontInfo {
    /// Font with no metrics beyond its name.
    pub fn named(name: &[u8], base_font: &str) -> Self {
        Self {
            name: name.to_vec(),
            base_font: strip_subset_prefix(base_font).to_string(),
            first_char: 0,
            widths: Vec::new(),
            cid_widths: BTreeMap::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
            two_byte: false,
            fixed_pitch: false,
            italic: false,
            force_bold: false,
        }
    }

    /// Advance of one character code, in 1/1000 em.
    pub fn glyph_width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }
}

/// An image XObject resolved from a page's resources.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendImage {
    pub data: Vec<u8>,
    pub format: NativeImageFormat,
}

/// A URI link annotation in PDF user space (bottom-left origin).
#[derive(Debug, Clone, PartialEq)]
pub struct BackendLink {
    pub rect: Rect,
    pub uri: String,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font metrics, content stream
/// decoding, image and annotation lookup without exposing any concrete
/// PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the page's MediaBox in user space.
    fn media_box(&self, page: PageId) -> Rect;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Resolve an image XObject by resource name. `None` for forms and
    /// missing entries.
    fn page_image(&self, page: PageId, name: &[u8]) -> Option<BackendImage>;

    /// Return the page's URI link annotations.
    fn page_links(&self, page: PageId) -> Vec<BackendLink>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Remove a subset tag such as `ABCDEF+` from a base font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => {
            rest
        }
        _ => name,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: implementation backed by lopdf
// ---------------------------------------------------------------------------

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

/// How many /Parent hops to follow for inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking /Parent for inheritable keys.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn font_info(&self, name: &[u8], font: &Dictionary) -> BackendFontInfo {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_else(|| "Unknown".to_string());
        let mut info = BackendFontInfo::named(name, &base_font);

        let is_type0 = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let descriptor_owner = if is_type0 {
            info.two_byte = true;
            info.default_width = 1000.0;
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| self.resolve_dict(o));
            if let Some(cid_font) = descendant {
                if let Some(dw) = cid_font.get(b"DW").ok().and_then(object_number) {
                    info.default_width = dw;
                }
                if let Some(w) = cid_font
                    .get(b"W")
                    .ok()
                    .and_then(|o| self.resolve(o))
                    .and_then(|o| o.as_array().ok())
                {
                    info.cid_widths = self.parse_cid_widths(w);
                }
            }
            descendant
        } else {
            info.first_char = font
                .get(b"FirstChar")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .map(|v| v.max(0) as u32)
                .unwrap_or(0);
            if let Some(widths) = font
                .get(b"Widths")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_array().ok())
            {
                info.widths = widths
                    .iter()
                    .map(|w| self.resolve(w).and_then(object_number).unwrap_or(0.0))
                    .collect();
            }
            Some(font)
        };

        let descriptor = descriptor_owner
            .and_then(|d| d.get(b"FontDescriptor").ok())
            .and_then(|o| self.resolve_dict(o));
        if let Some(descriptor) = descriptor {
            let flags = descriptor
                .get(b"Flags")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0);
            info.fixed_pitch = flags & FLAG_FIXED_PITCH != 0;
            info.italic = flags & FLAG_ITALIC != 0;
            let weight = descriptor
                .get(b"FontWeight")
                .ok()
                .and_then(object_number)
                .unwrap_or(0.0);
            info.force_bold = flags & FLAG_FORCE_BOLD != 0 || weight >= BOLD_WEIGHT;
        }
        info
    }

    /// Parse a CID `/W` array: `c [w1 w2 ...]` and `c_first c_last w` runs.
    fn parse_cid_widths(&self, w: &[Object]) -> BTreeMap<u32, f32> {
        let mut widths = BTreeMap::new();
        let mut i = 0;
        while i < w.len() {
            let Some(first) = self.resolve(&w[i]).and_then(|o| o.as_i64().ok()) else {
                break;
            };
            let first = first.max(0) as u32;
            match w.get(i + 1).and_then(|o| self.resolve(o)) {
                Some(Object::Array(run)) => {
                    for (offset, width) in run.iter().enumerate() {
                        if let Some(width) = self.resolve(width).and_then(object_number) {
                            widths.insert(first + offset as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = last.as_i64().ok().map(|v| v.max(0) as u32);
                    let width = w
                        .get(i + 2)
                        .and_then(|o| self.resolve(o))
                        .and_then(object_number);
                    if let (Some(last), Some(width)) = (last, width) {
                        for code in first..=last.min(first.saturating_add(0xFFFF)) {
                            widths.insert(code, width);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
        widths
    }

    fn image_from_stream(&self, stream: &Stream) -> Option<BackendImage> {
        let dict = &stream.dict;
        let subtype = dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        if subtype != Some(b"Image".as_slice()) {
            return None;
        }

        let filter = match dict.get(b"Filter").ok().and_then(|o| self.resolve(o)) {
            Some(Object::Name(n)) => n.clone(),
            Some(Object::Array(arr)) => arr
                .last()
                .and_then(|o| o.as_name().ok())
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let (data, format) = match filter.as_slice() {
            b"DCTDecode" => (stream.content.clone(), NativeImageFormat::Jpeg),
            b"JPXDecode" => (stream.content.clone(), NativeImageFormat::Jpeg2000),
            _ => {
                let width = dict.get(b"Width").ok().and_then(|o| o.as_i64().ok());
                let height = dict.get(b"Height").ok().and_then(|o| o.as_i64().ok());
                let bits = dict
                    .get(b"BitsPerComponent")
                    .ok()
                    .and_then(|o| o.as_i64().ok())
                    .unwrap_or(8);
                let components = dict
                    .get(b"ColorSpace")
                    .ok()
                    .map(|cs| self.color_components(cs))
                    .unwrap_or(1);
                let decoded = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let format = NativeImageFormat::Raw {
                    width: width?.max(0) as u32,
                    height: height?.max(0) as u32,
                    bits_per_component: bits.clamp(0, 16) as u8,
                    components,
                };
                (decoded, format)
            }
        };
        Some(BackendImage { data, format })
    }

    /// Number of color components, or 0 for color spaces we cannot expand.
    fn color_components(&self, cs: &Object) -> u8 {
        match self.resolve(cs) {
            Some(Object::Name(n)) => match n.as_slice() {
                b"DeviceGray" | b"CalGray" | b"G" => 1,
                b"DeviceRGB" | b"CalRGB" | b"RGB" => 3,
                b"DeviceCMYK" | b"CMYK" => 4,
                _ => 0,
            },
            Some(Object::Array(arr)) => {
                let family = arr.first().and_then(|o| o.as_name().ok());
                match family {
                    Some(b"ICCBased") => arr
                        .get(1)
                        .and_then(|o| self.resolve_dict(o))
                        .and_then(|d| d.get(b"N").ok())
                        .and_then(|o| o.as_i64().ok())
                        .map(|n| n.clamp(0, 4) as u8)
                        .unwrap_or(0),
                    Some(b"CalRGB") => 3,
                    Some(b"CalGray") => 1,
                    _ => 0,
                }
            }
            _ => 0,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> Rect {
        let values = self
            .inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .map(|arr| {
                arr.iter()
                    .take(4)
                    .map(|o| self.resolve(o).and_then(object_number))
                    .collect::<Vec<_>>()
            });
        match values.as_deref() {
            Some([Some(x0), Some(y0), Some(x1), Some(y1)]) => Rect::new(*x0, *y0, *x1, *y1),
            _ => Rect::new(0.0, 0.0, 612.0, 792.0),
        }
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(lopdf_fonts
            .iter()
            .map(|(name, font_dict)| self.font_info(name, font_dict))
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let streams: Vec<&Object> = match self.resolve(contents) {
            Some(Object::Array(arr)) => arr.iter().collect(),
            Some(other) => vec![other],
            None => return Err(Error::PdfParse("Invalid content stream".to_string())),
        };

        let mut content = Vec::new();
        for obj in streams {
            if let Some(Object::Stream(s)) = self.resolve(obj) {
                let data = s
                    .decompressed_content()
                    .unwrap_or_else(|_| s.content.clone());
                content.extend_from_slice(&data);
                content.push(b'\n');
            }
        }
        Ok(content)
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

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
        if let Ok(lopdf_fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = lopdf_fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn page_image(&self, page: PageId, name: &[u8]) -> Option<BackendImage> {
        let resources = self
            .inherited(page, b"Resources")
            .and_then(|o| self.resolve_dict(o))?;
        let xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve_dict(o))?;
        match self.resolve(xobjects.get(name).ok()?)? {
            Object::Stream(stream) => self.image_from_stream(stream),
            _ => None,
        }
    }

    fn page_links(&self, page: PageId) -> Vec<BackendLink> {
        let Some(annots) = self
            .doc
            .get_dictionary(page)
            .ok()
            .and_then(|d| d.get(b"Annots").ok())
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
        else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for annot in annots {
            let Some(dict) = self.resolve_dict(annot) else {
                continue;
            };
            let is_link = dict
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|n| n == b"Link");
            if !is_link {
                continue;
            }
            let Some(action) = dict.get(b"A").ok().and_then(|o| self.resolve_dict(o)) else {
                continue;
            };
            let is_uri = action
                .get(b"S")
                .ok()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|n| n == b"URI");
            let uri = match action.get(b"URI").ok().and_then(|o| self.resolve(o)) {
                Some(Object::String(bytes, _)) => decode_text_simple(bytes),
                _ => continue,
            };
            let rect = dict
                .get(b"Rect")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_array().ok())
                .map(|arr| {
                    arr.iter()
                        .map(|o| self.resolve(o).and_then(object_number))
                        .collect::<Vec<_>>()
                });
            let corners = rect.as_deref();
            if let (true, Some([Some(x0), Some(y0), Some(x1), Some(y1)])) = (is_uri, corners) {
                if !uri.is_empty() {
                    links.push(BackendLink {
                        rect: Rect::new(*x0, *y0, *x1, *y1),
                        uri,
                    });
                }
            }
        }
        links
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_get_number_from_value() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Other), None);
    }

    #[test]
    fn test_strip_subset_prefix() {
        assert_eq!(strip_subset_prefix("ABCDEF+Helvetica-Bold"), "Helvetica-Bold");
        assert_eq!(strip_subset_prefix("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_prefix("abc+Font"), "abc+Font");
    }

    #[test]
    fn test_glyph_width_lookup() {
        let mut font = BackendFontInfo::named(b"F1", "Helvetica");
        font.first_char = 32;
        font.widths = vec![278.0, 0.0, 355.0];
        assert_eq!(font.glyph_width(32), 278.0);
        // Zero entries and codes outside the table fall back to the default
        assert_eq!(font.glyph_width(33), DEFAULT_GLYPH_WIDTH);
        assert_eq!(font.glyph_width(34), 355.0);
        assert_eq!(font.glyph_width(10), DEFAULT_GLYPH_WIDTH);
    }

    #[test]
    fn test_two_byte_codes() {
        let mut font = BackendFontInfo::named(b"F2", "MSGothic");
        font.two_byte = true;
        font.default_width = 1000.0;
        font.cid_widths.insert(0x0102, 600.0);
        assert_eq!(font.codes(&[0x01, 0x02, 0x00, 0x41]), vec![0x0102, 0x0041]);
        assert_eq!(font.glyph_width(0x0102), 600.0);
        assert_eq!(font.glyph_width(0x0041), 1000.0);
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        let result = LopdfBackend::load_bytes(b"<html></html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
