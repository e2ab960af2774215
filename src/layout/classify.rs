//! Line-to-block classification.
//!
//! Every line of a page is tested against a fixed precedence: heading,
//! monospace, table membership, list item, and finally paragraph.
//! Lines that follow a classified line and continue it (same block kind,
//! vertically adjacent, compatible geometry) are folded into the block.

use std::collections::HashMap;

use crate::model::{Block, Line, Ruling, Span, TableRow, TextBody};
use crate::options::ConversionOptions;

use super::fonts::HeadingScale;
use super::lists::{parse_marker, ListContext, ParsedMarker};
use super::table_detector::{DetectedTable, TableDetector};

/// Maximum left-edge drift (pt) between lines of one paragraph.
const PARAGRAPH_X_DRIFT: f32 = 50.0;
/// Minimum size ratio between lines of one paragraph.
const PARAGRAPH_SIZE_RATIO: f32 = 0.8;
/// Minimum size ratio between a list item and its continuation lines.
const LIST_SIZE_RATIO: f32 = 0.5;
/// A bold line shorter than this followed by plain text stands alone.
const BOLD_LEAD_MAX_CHARS: usize = 100;

/// Kind of a single line under the classification precedence.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LineKind {
    Heading(u8),
    Code,
    ListItem(ParsedMarker),
    Text,
}

/// Classifies the lines of one page into blocks.
pub struct Classifier<'a> {
    options: &'a ConversionOptions,
    scale: &'a HeadingScale,
    detector: TableDetector,
    left_margin: Option<f32>,
}

impl<'a> Classifier<'a> {
    pub fn new(options: &'a ConversionOptions, scale: &'a HeadingScale) -> Self {
        Self {
            options,
            scale,
            detector: TableDetector::new(),
            left_margin: None,
        }
    }

    /// Measure list indentation from a fixed left margin instead of the
    /// leftmost line of each page.
    pub fn with_left_margin(mut self, margin: Option<f32>) -> Self {
        self.left_margin = margin;
        self
    }

    /// Classify one page.
    ///
    /// `lists` carries nesting state between pages; `next_table` numbers
    /// tables across the document.
    pub fn classify_page(
        &self,
        page: usize,
        lines: &[Line],
        rulings: &[Ruling],
        lists: &mut ListContext,
        next_table: &mut usize,
    ) -> Vec<Block> {
        let kinds: Vec<LineKind> = lines.iter().map(|l| self.line_kind(l)).collect();
        let tables = if self.options.detect_tables {
            let excluded: Vec<bool> = kinds
                .iter()
                .map(|k| matches!(k, LineKind::Heading(_) | LineKind::Code))
                .collect();
            self.detector.detect_excluding(lines, rulings, &excluded)
        } else {
            Vec::new()
        };
        let mut in_table = vec![false; lines.len()];
        let mut table_starts: HashMap<usize, &DetectedTable> = HashMap::new();
        for table in &tables {
            for &i in &table.lines {
                in_table[i] = true;
            }
            if let Some(&first) = table.lines.first() {
                table_starts.insert(first, table);
            }
        }

        let margin = self
            .left_margin
            .or_else(|| lines.iter().map(Line::x0).reduce(f32::min))
            .unwrap_or(0.0);

        let mut blocks = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            if let Some(table) = table_starts.get(&i) {
                blocks.extend(table_rows(table, page, *next_table));
                *next_table += 1;
                i += 1;
                continue;
            }
            if in_table[i] {
                i += 1;
                continue;
            }

            let free = |j: usize| j < lines.len() && !in_table[j];
            match kinds[i] {
                LineKind::Heading(level) => {
                    let mut body = vec![lines[i].clone()];
                    let mut j = i + 1;
                    while free(j)
                        && kinds[j] == LineKind::Heading(level)
                        && self.adjacent(&lines[j - 1], &lines[j], 1.0)
                    {
                        body.push(lines[j].clone());
                        j += 1;
                    }
                    blocks.push(Block::Heading {
                        level,
                        body: TextBody::new(body, page),
                    });
                    i = j;
                }
                LineKind::Code => {
                    let mut body = vec![lines[i].clone()];
                    let mut j = i + 1;
                    while free(j)
                        && kinds[j] == LineKind::Code
                        && self.adjacent(&lines[j - 1], &lines[j], 2.0)
                    {
                        body.push(lines[j].clone());
                        j += 1;
                    }
                    blocks.push(Block::CodeBlock(TextBody::new(body, page)));
                    i = j;
                }
                LineKind::ListItem(marker) => {
                    let marker_x = lines[i].x0();
                    let mut j = i + 1;
                    let mut first = strip_marker(&lines[i], marker);
                    if first.spans.is_empty() {
                        // Marker alone on its line: the item text is the next line.
                        if free(j)
                            && kinds[j] == LineKind::Text
                            && self.adjacent(&lines[i], &lines[j], 1.0)
                        {
                            first = lines[j].clone();
                            j += 1;
                        } else {
                            // Nothing to attach the marker to.
                            blocks.push(Block::Paragraph(TextBody::new(
                                vec![lines[i].clone()],
                                page,
                            )));
                            i = j;
                            continue;
                        }
                    }
                    let mut body = vec![first];
                    while free(j)
                        && kinds[j] == LineKind::Text
                        && lines[j].x0() > marker_x + 1.0
                        && size_ratio(&lines[j - 1], &lines[j]) >= LIST_SIZE_RATIO
                        && self.adjacent(&lines[j - 1], &lines[j], 1.0)
                    {
                        body.push(lines[j].clone());
                        j += 1;
                    }

                    let indent = (marker_x - margin) / (self.scale.base_size * 0.5);
                    let (level, tracked) =
                        lists.place(marker.token, indent, self.options.list_indent_spaces);
                    blocks.push(Block::ListItem {
                        marker: tracked,
                        level,
                        body: TextBody::new(body, page),
                    });
                    i = j;
                }
                LineKind::Text => {
                    let mut body = vec![lines[i].clone()];
                    let mut j = i + 1;
                    while free(j)
                        && kinds[j] == LineKind::Text
                        && self.continues_paragraph(&body, &lines[j])
                    {
                        body.push(lines[j].clone());
                        j += 1;
                    }
                    blocks.push(Block::Paragraph(TextBody::new(body, page)));
                    i = j;
                }
            }
        }

        log::debug!(
            "page {}: {} lines -> {} blocks ({} table(s))",
            page + 1,
            lines.len(),
            blocks.len(),
            tables.len()
        );
        blocks
    }

    fn line_kind(&self, line: &Line) -> LineKind {
        if self.options.detect_headings {
            if let Some(level) = self.scale.level_for(line.dominant_font_size()) {
                return LineKind::Heading(level);
            }
        }
        if line.is_monospace() {
            return LineKind::Code;
        }
        if self.options.detect_lists {
            if let Some(marker) = parse_marker(&line.text()) {
                return LineKind::ListItem(marker);
            }
        }
        LineKind::Text
    }

    /// Whether `next` sits directly below `prev`.
    ///
    /// `spacing` scales the allowed baseline advance in line heights.
    fn adjacent(&self, prev: &Line, next: &Line, spacing: f32) -> bool {
        let advance = next.baseline() - prev.baseline();
        advance > 0.0 && advance <= prev.height() * spacing + self.options.line_merge_threshold
    }

    fn continues_paragraph(&self, body: &[Line], next: &Line) -> bool {
        let Some(prev) = body.last() else {
            return false;
        };
        if prev.text().trim_end().ends_with('→') {
            return true;
        }
        if !self.adjacent(prev, next, 1.0) {
            return false;
        }
        if size_ratio(prev, next) < PARAGRAPH_SIZE_RATIO {
            return false;
        }
        if (next.x0() - prev.x0()).abs() > PARAGRAPH_X_DRIFT {
            return false;
        }
        // A short bold lead line acts as a pseudo-heading.
        if body.len() == 1
            && prev.is_bold()
            && !next.is_bold()
            && prev.text().chars().count() < BOLD_LEAD_MAX_CHARS
        {
            return false;
        }
        true
    }
}

fn size_ratio(a: &Line, b: &Line) -> f32 {
    let (sa, sb) = (a.dominant_font_size(), b.dominant_font_size());
    let max = sa.max(sb);
    if max <= 0.0 {
        1.0
    } else {
        sa.min(sb) / max
    }
}

/// Remove the marker characters from the front of a line's spans.
fn strip_marker(line: &Line, marker: ParsedMarker) -> Line {
    let text = line.text();
    let mut remaining = text
        .get(..marker.len)
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .count();

    let mut spans: Vec<Span> = Vec::with_capacity(line.spans.len());
    for span in &line.spans {
        if remaining == 0 {
            if spans.is_empty() {
                let trimmed = span.text.trim_start();
                if trimmed.is_empty() {
                    continue;
                }
                spans.push(keep_suffix(span, trimmed));
            } else {
                spans.push(span.clone());
            }
            continue;
        }
        let mut rest = span.text.as_str();
        while remaining > 0 {
            let Some(c) = rest.chars().next() else { break };
            if !c.is_whitespace() {
                remaining -= 1;
            }
            rest = &rest[c.len_utf8()..];
        }
        let rest = rest.trim_start();
        if !rest.is_empty() {
            spans.push(keep_suffix(span, rest));
        }
    }
    Line::from_spans(spans)
}

/// Keep the tail `rest` of a span's text, moving its left edge past the
/// dropped characters.
fn keep_suffix(span: &Span, rest: &str) -> Span {
    let dropped = span.text.chars().count() - rest.chars().count();
    let mut kept = span.clone();
    kept.bbox.x0 = (span.bbox.x0 + dropped as f32 * span.avg_char_width()).min(span.bbox.x1);
    kept.text = rest.to_string();
    kept
}

fn table_rows(table: &DetectedTable, page: usize, id: usize) -> Vec<Block> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let bbox = cells
                .iter()
                .flatten()
                .map(|s| s.bbox)
                .reduce(|a, b| a.union(&b))
                .unwrap_or(table.bbox);
            Block::TableRow(TableRow {
                cells: cells.clone(),
                is_header: r == 0,
                table: id,
                page,
                bbox,
            })
        })
        .collect()
}
