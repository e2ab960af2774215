//! Markdown rendering for classified documents.

use std::sync::LazyLock;

use regex::Regex;

use crate::layout::lists::to_roman;
use crate::model::{
    Block, Document, DocumentItem, Line, ListMarker, MarkerKind, Span, TableRow, TextBody,
};
use crate::options::ConversionOptions;

/// A comma stranded before the closing period of a block: `word , .`
static TRAILING_COMMA_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*\.\s*$").expect("valid trailing comma regex"));

/// A run of empty comma-separated slots: `word, , , .`
static EMPTY_COMMA_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*,\s*,\s*\.").expect("valid comma run regex"));

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &ConversionOptions) -> String {
    MarkdownRenderer::new(options).render(doc)
}

/// How a rendered block joins the block before it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Joint {
    ListItem,
    TableRow(usize),
    Other,
}

/// Markdown renderer.
pub struct MarkdownRenderer<'a> {
    options: &'a ConversionOptions,
}

impl<'a> MarkdownRenderer<'a> {
    /// Create a new Markdown renderer.
    pub fn new(options: &'a ConversionOptions) -> Self {
        Self { options }
    }

    /// Render a document in one forward pass.
    pub fn render(&self, doc: &Document) -> String {
        let mut output = String::new();
        let mut previous: Option<Joint> = None;
        let mut page_break = false;
        let mut table_columns = 0;

        for item in &doc.items {
            let block = match item {
                DocumentItem::PageBreak => {
                    page_break = previous.is_some();
                    continue;
                }
                DocumentItem::Block(block) => block,
            };

            let joint = match block {
                Block::ListItem { .. } => Joint::ListItem,
                Block::TableRow(row) => Joint::TableRow(row.table),
                _ => Joint::Other,
            };
            if let Block::TableRow(row) = block {
                if previous != Some(joint) || row.is_header {
                    table_columns = row.cells.len();
                }
            }

            let rendered = self.render_block(block, table_columns);
            if rendered.is_empty() {
                continue;
            }

            if let Some(prev) = previous {
                if page_break {
                    output.push_str(&self.options.page_separator);
                } else if prev == joint && joint != Joint::Other {
                    output.push('\n');
                } else {
                    output.push_str("\n\n");
                }
            }
            output.push_str(&rendered);
            previous = Some(joint);
            page_break = false;
        }

        output.trim().to_string()
    }

    fn render_block(&self, block: &Block, table_columns: usize) -> String {
        match block {
            Block::Heading { level, body } => {
                let text = self.render_inline(body, false);
                if text.is_empty() {
                    return String::new();
                }
                format!("{} {}", "#".repeat((*level).clamp(1, 6) as usize), text)
            }
            Block::Paragraph(body) => escape_leading_hash(self.render_inline(body, true)),
            Block::ListItem {
                marker,
                level,
                body,
            } => {
                let text = self.render_inline(body, true);
                let indent = " ".repeat(self.options.list_indent_spaces * level);
                format!("{}{} {}", indent, marker_label(marker), text)
                    .trim_end()
                    .to_string()
            }
            Block::TableRow(row) => self.render_table_row(row, table_columns),
            Block::CodeBlock(body) => render_code(body),
            Block::Image(image) => format!("![]({})", image.path),
        }
    }

    /// Render the lines of a text block as one line of inline Markdown.
    fn render_inline(&self, body: &TextBody, emphasis: bool) -> String {
        let emphasis = emphasis && self.options.detect_bold_italic;

        let mut runs: Vec<Run> = Vec::new();
        let line_count = body.lines.len();
        for (line_idx, line) in body.lines.iter().enumerate() {
            let joins_hyphenated = line_idx + 1 < line_count && ends_with_hyphenated_word(line);
            let span_count = line.spans.len();
            for (i, span) in line.spans.iter().enumerate() {
                let mut text = span.text.clone();
                if i > 0 && line.needs_space_before(i) {
                    text.insert(0, ' ');
                }
                if i + 1 == span_count {
                    if joins_hyphenated {
                        text.pop();
                    } else if line_idx + 1 < line_count {
                        text.push(' ');
                    }
                }
                push_run(&mut runs, self.run(text, span, emphasis));
            }
        }
        tidy_punctuation(render_runs(&runs))
    }

    /// Render one table row, padded or cut to `columns` cells.
    fn render_table_row(&self, row: &TableRow, columns: usize) -> String {
        let emphasis = self.options.detect_bold_italic;
        let columns = columns.max(1);
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let mut runs: Vec<Run> = Vec::new();
                for span in row.cells.get(i).into_iter().flatten() {
                    let text = span.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let text = if runs.is_empty() {
                        text.to_string()
                    } else {
                        format!(" {text}")
                    };
                    push_run(&mut runs, self.run(text, span, emphasis));
                }
                render_runs(&runs)
            })
            .collect();

        let mut output = format!("| {} |", cells.join(" | "));
        if row.is_header {
            output.push('\n');
            output.push_str(&format!("|{}", " --- |".repeat(columns)));
        }
        output
    }

    fn run(&self, text: String, span: &Span, emphasis: bool) -> Run {
        Run {
            text,
            bold: emphasis && span.flags.bold,
            italic: emphasis && span.flags.italic,
            link: if self.options.preserve_hyperlinks {
                span.link.clone()
            } else {
                None
            },
        }
    }
}

fn push_run(runs: &mut Vec<Run>, run: Run) {
    match runs.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => runs.push(run),
    }
}

/// Render runs as a single line; escaping covers `|` for table cells.
fn render_runs(runs: &[Run]) -> String {
    let mut output = String::new();
    for run in runs {
        run.render_into(&mut output);
    }
    collapse_whitespace(&output)
}

/// Drop commas left behind by empty fields before a closing period.
fn tidy_punctuation(text: String) -> String {
    if !text.contains(',') {
        return text;
    }
    let text = EMPTY_COMMA_RUN.replace_all(&text, ".");
    TRAILING_COMMA_PERIOD.replace(&text, ".").into_owned()
}

/// Consecutive text sharing emphasis and link target.
#[derive(Debug)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
    link: Option<String>,
}

impl Run {
    fn same_style(&self, other: &Run) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.link == other.link
    }

    /// Emit the run with whitespace kept outside emphasis and link markers.
    fn render_into(&self, output: &mut String) {
        let core = self.text.trim();
        if core.is_empty() {
            output.push_str(&self.text);
            return;
        }
        let lead = &self.text[..self.text.len() - self.text.trim_start().len()];
        let trail = &self.text[self.text.trim_end().len()..];

        let marker = match (self.bold, self.italic) {
            (true, true) => "***",
            (true, false) => "**",
            (false, true) => "*",
            (false, false) => "",
        };
        let styled = format!("{marker}{}{marker}", escape_markdown(core));

        output.push_str(lead);
        match &self.link {
            Some(uri) => output.push_str(&format!("[{}]({})", styled, escape_uri(uri))),
            None => output.push_str(&styled),
        }
        output.push_str(trail);
    }
}

/// Marker text for a list item: `-`, `3.`, `b.`, `iv.` and so on.
pub fn marker_label(marker: &ListMarker) -> String {
    let ordinal = marker.ordinal.max(1);
    match marker.kind {
        MarkerKind::Bullet => "-".to_string(),
        MarkerKind::Decimal => format!("{ordinal}."),
        MarkerKind::LowerAlpha => format!("{}.", alpha_label(ordinal)),
        MarkerKind::UpperAlpha => format!("{}.", alpha_label(ordinal).to_uppercase()),
        MarkerKind::LowerRoman => format!("{}.", to_roman(ordinal).to_lowercase()),
        MarkerKind::UpperRoman => format!("{}.", to_roman(ordinal)),
    }
}

/// 1 → a, 26 → z, 27 → aa.
fn alpha_label(mut ordinal: u32) -> String {
    let mut label = Vec::new();
    while ordinal > 0 {
        ordinal -= 1;
        label.push(char::from(b'a' + (ordinal % 26) as u8));
        ordinal /= 26;
    }
    label.iter().rev().collect()
}

/// Fenced code block keeping each line's indentation relative to the
/// leftmost line.
fn render_code(body: &TextBody) -> String {
    if body.lines.is_empty() {
        return String::new();
    }
    let left = body
        .lines
        .iter()
        .map(Line::x0)
        .fold(f32::INFINITY, f32::min);

    let mut output = String::from("```\n");
    for line in &body.lines {
        let char_width = code_char_width(line);
        let indent = ((line.x0() - left) / char_width).round().max(0.0) as usize;
        output.push_str(&" ".repeat(indent));
        for (i, span) in line.spans.iter().enumerate() {
            if i > 0 {
                let gap = span.bbox.x0 - line.spans[i - 1].bbox.x1;
                let spaces = (gap / char_width).round().max(0.0) as usize;
                let spaces = if spaces == 0 && line.needs_space_before(i) {
                    1
                } else {
                    spaces
                };
                output.push_str(&" ".repeat(spaces));
            }
            output.push_str(&span.text);
        }
        let trimmed = output.trim_end_matches(' ').len();
        output.truncate(trimmed);
        output.push('\n');
    }
    output.push_str("```");
    output
}

fn code_char_width(line: &Line) -> f32 {
    let width = line
        .spans
        .iter()
        .find(|s| !s.text.trim().is_empty())
        .map(|s| s.avg_char_width())
        .unwrap_or(0.0);
    if width > 0.0 {
        width
    } else {
        (line.dominant_font_size() * 0.6).max(1.0)
    }
}

/// True when the line ends in a letter followed by `-`.
fn ends_with_hyphenated_word(line: &Line) -> bool {
    let Some(last) = line.spans.last() else {
        return false;
    };
    let mut chars = last.text.chars().rev();
    matches!((chars.next(), chars.next()), (Some('-'), Some(c)) if c.is_alphabetic())
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

fn escape_leading_hash(text: String) -> String {
    if text.starts_with('#') {
        format!("\\{text}")
    } else {
        text
    }
}

fn escape_uri(uri: &str) -> String {
    uri.replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
        .replace('|', "%7C")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
