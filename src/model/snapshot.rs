//! Decoded page content handed to the layout engine.
//!
//! A [`PageSnapshot`] is what a decoder produces for one page: positioned
//! text spans, embedded images, link annotations and ruling lines. The
//! engine treats snapshots as read-only input.

use super::Rect;
use serde::{Deserialize, Serialize};

/// Substrings of font names that indicate a fixed-pitch face.
const MONOSPACE_FONT_HINTS: &[&str] = &[
    "mono",
    "courier",
    "consolas",
    "menlo",
    "monaco",
    "inconsolata",
    "source code",
    "sourcecode",
    "fira code",
    "firacode",
    "jetbrains",
    "hack",
    "fixed",
    "terminal",
    "lucida console",
    "lucidaconsole",
    "sf mono",
    "andale mono",
    "cascadia",
];

/// Inline style flags of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

impl StyleFlags {
    /// Plain upright text.
    pub const PLAIN: StyleFlags = StyleFlags {
        bold: false,
        italic: false,
        monospace: false,
    };

    /// Guess style flags from a font name such as `Helvetica-BoldOblique`.
    pub fn from_font_name(font_name: &str) -> Self {
        let lower = font_name.to_lowercase();
        Self {
            bold: lower.contains("bold")
                || lower.contains("black")
                || lower.contains("heavy")
                || lower.contains("semibold"),
            italic: lower.contains("italic") || lower.contains("oblique"),
            monospace: MONOSPACE_FONT_HINTS.iter().any(|hint| lower.contains(hint)),
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_monospace(mut self, monospace: bool) -> Self {
        self.monospace = monospace;
        self
    }
}

/// A run of text sharing one font, size and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// The text content
    pub text: String,
    /// Bounding box on the page
    pub bbox: Rect,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Inline style
    pub flags: StyleFlags,
    /// Fill color as 0xRRGGBB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Hyperlink target, set by the link mapper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Span {
    /// Create a span with style flags derived from the font name.
    pub fn new(
        text: impl Into<String>,
        bbox: Rect,
        font_name: impl Into<String>,
        font_size: f32,
    ) -> Self {
        let font_name = font_name.into();
        let flags = StyleFlags::from_font_name(&font_name);
        Self {
            text: text.into(),
            bbox,
            font_name,
            font_size,
            flags,
            color: None,
            link: None,
        }
    }

    /// Replace the style flags.
    pub fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the fill color.
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the hyperlink target.
    pub fn with_link(mut self, uri: impl Into<String>) -> Self {
        self.link = Some(uri.into());
        self
    }

    /// Baseline, approximated by the bottom edge of the box.
    pub fn baseline(&self) -> f32 {
        self.bbox.y1
    }

    /// Average glyph width, falling back to half the font size.
    pub fn avg_char_width(&self) -> f32 {
        let chars = self.text.chars().count();
        if chars > 0 && self.bbox.width() > 0.0 {
            self.bbox.width() / chars as f32
        } else {
            self.font_size * 0.5
        }
    }
}

/// Native encoding of an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeImageFormat {
    /// DCT-encoded data
    Jpeg,
    /// PNG file data
    Png,
    /// JPX-encoded data
    Jpeg2000,
    /// Uncompressed samples
    Raw {
        width: u32,
        height: u32,
        bits_per_component: u8,
        components: u8,
    },
}

impl NativeImageFormat {
    /// File extension for the native bytes.
    pub fn extension(&self) -> &'static str {
        match self {
            NativeImageFormat::Jpeg => "jpg",
            NativeImageFormat::Png => "png",
            NativeImageFormat::Jpeg2000 => "jp2",
            NativeImageFormat::Raw { .. } => "raw",
        }
    }
}

/// An image drawn on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlob {
    /// Placement on the page
    pub bbox: Rect,
    /// Encoded or raw sample bytes
    #[serde(skip)]
    pub data: Vec<u8>,
    /// How `data` is encoded
    pub format: NativeImageFormat,
}

/// A URI link annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAnnotation {
    /// Clickable area
    pub bbox: Rect,
    /// Target URI
    pub uri: String,
}

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A straight stroke or thin filled rectangle, used to find ruled tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ruling {
    pub start: Point,
    pub end: Point,
}

impl Ruling {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            start: Point::new(x0, y0),
            end: Point::new(x1, y1),
        }
    }

    /// True when the segment is horizontal within `eps`.
    pub fn is_horizontal(&self, eps: f32) -> bool {
        (self.start.y - self.end.y).abs() <= eps && (self.start.x - self.end.x).abs() > eps
    }

    /// True when the segment is vertical within `eps`.
    pub fn is_vertical(&self, eps: f32) -> bool {
        (self.start.x - self.end.x).abs() <= eps && (self.start.y - self.end.y).abs() > eps
    }
}

/// Everything decoded from one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// 0-based page index
    pub index: usize,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Text spans in content-stream order
    pub spans: Vec<Span>,
    /// Embedded images
    pub images: Vec<ImageBlob>,
    /// URI link annotations
    pub links: Vec<LinkAnnotation>,
    /// Ruling lines
    pub rulings: Vec<Ruling>,
}

impl PageSnapshot {
    /// Create an empty US Letter page.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            width: 612.0,
            height: 792.0,
            ..Self::default()
        }
    }

    pub fn with_spans(mut self, spans: Vec<Span>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_links(mut self, links: Vec<LinkAnnotation>) -> Self {
        self.links = links;
        self
    }

    pub fn with_rulings(mut self, rulings: Vec<Ruling>) -> Self {
        self.rulings = rulings;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageBlob>) -> Self {
        self.images = images;
        self
    }
}
