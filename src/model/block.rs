//! Lines and classified blocks.

use super::{Rect, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spans sharing one baseline band, ordered left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// The spans in this line, sorted by X position
    pub spans: Vec<Span>,
    /// Union of the span boxes
    pub bbox: Rect,
}

impl Line {
    /// Build a line, sorting spans by X and computing the union box.
    pub fn from_spans(mut spans: Vec<Span>) -> Self {
        spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let bbox = spans
            .iter()
            .map(|s| s.bbox)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default();
        Self { spans, bbox }
    }

    /// Left edge.
    pub fn x0(&self) -> f32 {
        self.bbox.x0
    }

    /// Baseline of the first span.
    pub fn baseline(&self) -> f32 {
        self.spans
            .iter()
            .map(Span::baseline)
            .reduce(f32::min)
            .unwrap_or(self.bbox.y1)
    }

    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    /// Most frequent span size (0.1pt resolution).
    ///
    /// Ties go to the size covering more characters, then to the smaller size.
    pub fn dominant_font_size(&self) -> f32 {
        let mut counts: BTreeMap<i32, (usize, usize)> = BTreeMap::new();
        for span in &self.spans {
            let entry = counts.entry(size_key(span.font_size)).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += span.text.chars().count();
        }
        // BTreeMap iterates ascending, and max_by_key keeps the last max,
        // so reverse to let the smaller size win a full tie.
        counts
            .iter()
            .rev()
            .max_by_key(|(_, &(spans, chars))| (spans, chars))
            .map(|(&key, _)| key as f32 / 10.0)
            .unwrap_or(0.0)
    }

    /// Whether a space belongs between span `i - 1` and span `i`.
    ///
    /// Inserts a space when the gap exceeds 20% of the average glyph
    /// width, except between spaceless-script characters or when either
    /// side already carries whitespace.
    pub fn needs_space_before(&self, i: usize) -> bool {
        if i == 0 || i >= self.spans.len() {
            return false;
        }
        let prev = &self.spans[i - 1];
        let span = &self.spans[i];

        let gap = span.bbox.x0 - prev.bbox.x1;
        if gap <= span.avg_char_width() * 0.2 {
            return false;
        }

        let prev_last = prev.text.chars().last();
        let curr_first = span.text.chars().next();
        if prev_last.is_some_and(char::is_whitespace) || curr_first.is_some_and(char::is_whitespace)
        {
            return false;
        }
        let prev_cjk = prev_last.is_some_and(is_spaceless_script_char);
        let curr_cjk = curr_first.is_some_and(is_spaceless_script_char);
        !(prev_cjk && curr_cjk)
    }

    /// Combined text with gap-based spacing.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if self.needs_space_before(i) {
                result.push(' ');
            }
            result.push_str(&span.text);
        }
        result
    }

    /// True when every span with visible text is bold.
    pub fn is_bold(&self) -> bool {
        let mut visible = self.spans.iter().filter(|s| !s.text.trim().is_empty());
        let mut any = false;
        let all = visible.all(|s| {
            any = true;
            s.flags.bold
        });
        any && all
    }

    /// True when every span with visible text is monospace.
    pub fn is_monospace(&self) -> bool {
        let mut any = false;
        let all = self
            .spans
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .all(|s| {
                any = true;
                s.flags.monospace
            });
        any && all
    }
}

/// Histogram key for a font size at 0.1pt resolution.
pub fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

/// Ordered lines of one text block on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub lines: Vec<Line>,
    /// 0-based page index where the block starts
    pub page: usize,
}

impl TextBody {
    pub fn new(lines: Vec<Line>, page: usize) -> Self {
        Self { lines, page }
    }

    /// Union of the line boxes.
    pub fn bbox(&self) -> Rect {
        self.lines
            .iter()
            .map(|l| l.bbox)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default()
    }

    /// Line texts joined by single spaces.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn first_line(&self) -> Option<&Line> {
        self.lines.first()
    }

    pub fn last_line(&self) -> Option<&Line> {
        self.lines.last()
    }
}

/// Numbering style of a list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    /// •, -, * and similar glyphs
    Bullet,
    /// 1. 2. 3.
    Decimal,
    /// a. b. c.
    LowerAlpha,
    /// A. B. C.
    UpperAlpha,
    /// i. ii. iii.
    LowerRoman,
    /// I. II. III.
    UpperRoman,
}

/// Group of marker kinds that continue each other as siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerFamily {
    Bullet,
    Numbered,
    Lettered,
}

impl MarkerKind {
    pub fn family(self) -> MarkerFamily {
        match self {
            MarkerKind::Bullet => MarkerFamily::Bullet,
            MarkerKind::Decimal | MarkerKind::LowerRoman | MarkerKind::UpperRoman => {
                MarkerFamily::Numbered
            }
            MarkerKind::LowerAlpha | MarkerKind::UpperAlpha => MarkerFamily::Lettered,
        }
    }

    pub fn is_ordered(self) -> bool {
        self != MarkerKind::Bullet
    }
}

/// Marker of a list item as tracked by the nesting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMarker {
    pub kind: MarkerKind,
    /// 1-based position within its list
    pub ordinal: u32,
}

impl ListMarker {
    pub fn new(kind: MarkerKind, ordinal: u32) -> Self {
        Self { kind, ordinal }
    }

    pub fn bullet() -> Self {
        Self::new(MarkerKind::Bullet, 1)
    }
}

/// One row of a detected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells left to right, each an ordered list of spans
    pub cells: Vec<Vec<Span>>,
    /// First row of its table
    pub is_header: bool,
    /// Document-wide table number, shared by all rows of one table
    pub table: usize,
    pub page: usize,
    pub bbox: Rect,
}

impl TableRow {
    /// Plain text of one cell.
    pub fn cell_text(&self, index: usize) -> String {
        self.cells
            .get(index)
            .map(|spans| {
                spans
                    .iter()
                    .map(|s| s.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

/// Reference to an exported image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Path used in the Markdown reference
    pub path: String,
    pub page: usize,
    pub bbox: Rect,
}

/// A classified unit of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, body: TextBody },
    Paragraph(TextBody),
    ListItem {
        marker: ListMarker,
        level: usize,
        body: TextBody,
    },
    TableRow(TableRow),
    CodeBlock(TextBody),
    Image(ImageRef),
}

impl Block {
    /// Page where the block starts.
    pub fn page(&self) -> usize {
        match self {
            Block::Heading { body, .. }
            | Block::Paragraph(body)
            | Block::ListItem { body, .. }
            | Block::CodeBlock(body) => body.page,
            Block::TableRow(row) => row.page,
            Block::Image(image) => image.page,
        }
    }

    pub fn bbox(&self) -> Rect {
        match self {
            Block::Heading { body, .. }
            | Block::Paragraph(body)
            | Block::ListItem { body, .. }
            | Block::CodeBlock(body) => body.bbox(),
            Block::TableRow(row) => row.bbox,
            Block::Image(image) => image.bbox,
        }
    }

    /// Text lines of text-bearing blocks.
    pub fn body(&self) -> Option<&TextBody> {
        match self {
            Block::Heading { body, .. }
            | Block::Paragraph(body)
            | Block::ListItem { body, .. }
            | Block::CodeBlock(body) => Some(body),
            Block::TableRow(_) | Block::Image(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut TextBody> {
        match self {
            Block::Heading { body, .. }
            | Block::Paragraph(body)
            | Block::ListItem { body, .. }
            | Block::CodeBlock(body) => Some(body),
            Block::TableRow(_) | Block::Image(_) => None,
        }
    }

    /// Plain text of the block.
    pub fn text(&self) -> String {
        match self {
            Block::TableRow(row) => (0..row.cells.len())
                .map(|i| row.cell_text(i))
                .collect::<Vec<_>>()
                .join(" "),
            Block::Image(_) => String::new(),
            _ => self.body().map(TextBody::text).unwrap_or_default(),
        }
    }
}
