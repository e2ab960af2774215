//! Document-level types.

use super::Block;
use serde::{Deserialize, Serialize};

/// One entry of the finalized document sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentItem {
    Block(Block),
    /// Boundary between two pages with content
    PageBreak,
}

/// Classified blocks in reading order, separated by page breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub items: Vec<DocumentItem>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.
    pub fn push_block(&mut self, block: Block) {
        self.items.push(DocumentItem::Block(block));
    }

    /// Append a page break.
    pub fn push_page_break(&mut self) {
        self.items.push(DocumentItem::PageBreak);
    }

    /// Iterate over blocks, skipping page breaks.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            DocumentItem::Block(block) => Some(block),
            DocumentItem::PageBreak => None,
        })
    }

    /// Number of page breaks.
    pub fn page_break_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, DocumentItem::PageBreak))
            .count()
    }

    /// Check if the document has any blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks().next().is_none()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.blocks()
            .map(Block::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Line, Rect, Span, TextBody};

    fn paragraph(text: &str, page: usize) -> Block {
        let span = Span::new(text, Rect::new(0.0, 0.0, 50.0, 12.0), "Helvetica", 12.0);
        Block::Paragraph(TextBody::new(vec![Line::from_spans(vec![span])], page))
    }

    #[test]
    fn test_document_blocks_skip_breaks() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        doc.push_block(paragraph("one", 0));
        doc.push_page_break();
        doc.push_block(paragraph("two", 1));

        assert_eq!(doc.blocks().count(), 2);
        assert_eq!(doc.page_break_count(), 1);
        assert_eq!(doc.plain_text(), "one\n\ntwo");
    }
}
