//! Extraction statistics.

use crate::model::{Block, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Statistics collected during conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total number of pages processed
    pub page_count: u32,

    /// Number of headings extracted
    pub heading_count: u32,

    /// Number of paragraphs extracted
    pub paragraph_count: u32,

    /// Number of list items extracted
    pub list_item_count: u32,

    /// Number of tables extracted
    pub table_count: u32,

    /// Number of table rows, header rows included
    pub table_row_count: u32,

    /// Number of fenced code blocks
    pub code_block_count: u32,

    /// Number of images referenced
    pub image_count: u32,

    /// Number of link annotations mapped onto text
    pub link_count: u32,

    /// Number of blocks stitched across page boundaries
    pub merge_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the blocks of a classified document.
    pub fn from_document(doc: &Document) -> Self {
        let mut stats = Self::new();
        let mut tables = BTreeSet::new();
        for block in doc.blocks() {
            match block {
                Block::Heading { .. } => stats.heading_count += 1,
                Block::Paragraph(_) => stats.paragraph_count += 1,
                Block::ListItem { .. } => stats.list_item_count += 1,
                Block::TableRow(row) => {
                    stats.table_row_count += 1;
                    tables.insert(row.table);
                }
                Block::CodeBlock(_) => stats.code_block_count += 1,
                Block::Image(_) => stats.image_count += 1,
            }
        }
        stats.table_count = tables.len() as u32;
        stats
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.page_count += other.page_count;
        self.heading_count += other.heading_count;
        self.paragraph_count += other.paragraph_count;
        self.list_item_count += other.list_item_count;
        self.table_count += other.table_count;
        self.table_row_count += other.table_row_count;
        self.code_block_count += other.code_block_count;
        self.image_count += other.image_count;
        self.link_count += other.link_count;
        self.merge_count += other.merge_count;
        self.word_count += other.word_count;
        self.char_count += other.char_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Line, Rect, Span, TableRow, TextBody};

    fn body(text: &str) -> TextBody {
        let span = Span::new(text, Rect::new(0.0, 0.0, 50.0, 12.0), "Helvetica", 12.0);
        TextBody::new(vec![Line::from_spans(vec![span])], 0)
    }

    fn row(table: usize) -> Block {
        Block::TableRow(TableRow {
            cells: vec![vec![], vec![]],
            is_header: false,
            table,
            page: 0,
            bbox: Rect::default(),
        })
    }

    #[test]
    fn test_extraction_stats_count_text() {
        let mut stats = ExtractionStats::new();
        stats.count_text("Hello, world! This is a test.");

        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.char_count, 24);
    }

    #[test]
    fn test_stats_from_document() {
        let mut doc = Document::new();
        doc.push_block(Block::Heading {
            level: 1,
            body: body("Title"),
        });
        doc.push_block(Block::Paragraph(body("Text")));
        doc.push_block(row(0));
        doc.push_block(row(0));
        doc.push_page_break();
        doc.push_block(row(1));
        doc.push_block(Block::CodeBlock(body("x = 1")));

        let stats = ExtractionStats::from_document(&doc);
        assert_eq!(stats.heading_count, 1);
        assert_eq!(stats.paragraph_count, 1);
        assert_eq!(stats.table_count, 2);
        assert_eq!(stats.table_row_count, 3);
        assert_eq!(stats.code_block_count, 1);
        assert_eq!(stats.list_item_count, 0);
    }

    #[test]
    fn test_extraction_stats_merge() {
        let mut stats1 = ExtractionStats {
            paragraph_count: 5,
            table_count: 2,
            ..Default::default()
        };
        let stats2 = ExtractionStats {
            paragraph_count: 3,
            table_count: 1,
            image_count: 4,
            merge_count: 1,
            ..Default::default()
        };

        stats1.merge(&stats2);

        assert_eq!(stats1.paragraph_count, 8);
        assert_eq!(stats1.table_count, 3);
        assert_eq!(stats1.image_count, 4);
        assert_eq!(stats1.merge_count, 1);
    }
}
