//! Cross-page continuation merging.
//!
//! The last block of each page is held back until the next page with
//! content arrives. If the held block is an unfinished paragraph and the
//! next page opens with a paragraph at the same indentation, the two
//! become one block and no page separator is emitted between them. An
//! unfinished list item absorbs a marker-less paragraph aligned with the
//! item's text; two marked items are never fused.

use crate::model::{Block, Document};

/// Maximum left-edge difference (pt) between the two halves of a merge.
pub const MAX_MERGE_X_DRIFT: f32 = 20.0;
/// Maximum distance (pt) between a list item's text edge and a
/// continuation paragraph.
pub const MAX_ITEM_TEXT_DRIFT: f32 = 6.0;

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ':', ';', '。', '！', '？', '：', '；'];
const CLOSING_MARKS: &[char] = &['"', '\'', '”', '’', '»', ')', ']', '}'];

/// Stitches per-page block lists into the document.
#[derive(Debug, Default)]
pub struct PageMerger {
    pending: Option<Block>,
    merges: usize,
}

impl PageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cross-page merges performed so far.
    pub fn merge_count(&self) -> usize {
        self.merges
    }

    /// Consume one page's blocks. Pages without blocks leave no trace.
    pub fn push_page(&mut self, blocks: Vec<Block>, doc: &mut Document) {
        let mut blocks = blocks.into_iter();
        let Some(leading) = blocks.next() else {
            return;
        };

        let mut rest: Vec<Block> = blocks.collect();
        match self.pending.take() {
            None => {
                rest.insert(0, leading);
                self.hold_last(rest, doc);
            }
            Some(trailing) => {
                if can_merge(&trailing, &leading) {
                    let merged = merge(trailing, leading);
                    self.merges += 1;
                    log::debug!("merged block across page boundary");
                    if rest.is_empty() {
                        self.pending = Some(merged);
                    } else {
                        doc.push_block(merged);
                        doc.push_page_break();
                        self.hold_last(rest, doc);
                    }
                } else {
                    doc.push_block(trailing);
                    doc.push_page_break();
                    rest.insert(0, leading);
                    self.hold_last(rest, doc);
                }
            }
        }
    }

    /// Flush the held block.
    pub fn finish(&mut self, doc: &mut Document) {
        if let Some(block) = self.pending.take() {
            doc.push_block(block);
        }
    }

    fn hold_last(&mut self, mut blocks: Vec<Block>, doc: &mut Document) {
        self.pending = blocks.pop();
        for block in blocks {
            doc.push_block(block);
        }
    }
}

/// Whether `leading` (top of a page) continues `trailing` (bottom of the
/// previous page).
pub fn can_merge(trailing: &Block, leading: &Block) -> bool {
    let leading = match (trailing, leading) {
        (Block::Paragraph(_) | Block::ListItem { .. }, Block::Paragraph(body)) => body,
        _ => return false,
    };
    let (Some(body), Some(head)) = (trailing.body(), leading.first_line()) else {
        return false;
    };
    let Some(tail) = body.last_line() else {
        return false;
    };
    if ends_sentence(&tail.text()) {
        return false;
    }

    match trailing {
        Block::ListItem { .. } => body
            .first_line()
            .is_some_and(|text| (head.x0() - text.x0()).abs() <= MAX_ITEM_TEXT_DRIFT),
        _ => (head.x0() - tail.x0()).abs() <= MAX_MERGE_X_DRIFT,
    }
}

/// Whether text ends in sentence-terminal punctuation, ignoring closing
/// quotes and brackets.
pub fn ends_sentence(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(|c: char| CLOSING_MARKS.contains(&c) || c.is_whitespace())
        .ends_with(TERMINAL_PUNCTUATION)
}

fn merge(mut trailing: Block, leading: Block) -> Block {
    let lines = match leading {
        Block::Paragraph(body) => body.lines,
        _ => Vec::new(),
    };
    if let Some(body) = trailing.body_mut() {
        body.lines.extend(lines);
    }
    trailing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentItem, Line, ListMarker, Rect, Span, TextBody};

    fn body(text: &str, x: f32, page: usize) -> TextBody {
        let span = Span::new(
            text,
            Rect::new(x, 88.0, x + text.len() as f32 * 6.0, 100.0),
            "Helvetica",
            12.0,
        );
        TextBody::new(vec![Line::from_spans(vec![span])], page)
    }

    fn para(text: &str, x: f32, page: usize) -> Block {
        Block::Paragraph(body(text, x, page))
    }

    fn item(text: &str, level: usize, page: usize) -> Block {
        Block::ListItem {
            marker: ListMarker::bullet(),
            level,
            body: body(text, 84.0, page),
        }
    }

    #[test]
    fn test_continuation_merges_without_break() {
        let mut doc = Document::new();
        let mut merger = PageMerger::new();
        merger.push_page(vec![para("...and continues", 72.0, 0)], &mut doc);
        merger.push_page(vec![para("onto the next page.", 72.0, 1)], &mut doc);
        merger.finish(&mut doc);

        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.page_break_count(), 0);
        assert_eq!(merger.merge_count(), 1);
        assert_eq!(doc.plain_text(), "...and continues onto the next page.");
    }

    #[test]
    fn test_terminal_punctuation_blocks_merge() {
        let mut doc = Document::new();
        let mut merger = PageMerger::new();
        merger.push_page(vec![para("A finished sentence.", 72.0, 0)], &mut doc);
        merger.push_page(vec![para("New start", 72.0, 1)], &mut doc);
        merger.finish(&mut doc);

        assert_eq!(doc.blocks().count(), 2);
        assert_eq!(doc.page_break_count(), 1);
    }

    #[test]
    fn test_break_kept_after_merged_unit() {
        let mut doc = Document::new();
        let mut merger = PageMerger::new();
        merger.push_page(vec![para("Intro", 72.0, 0), para("runs on", 72.0, 0)], &mut doc);
        merger.push_page(vec![para("and ends.", 72.0, 1), para("Next", 72.0, 1)], &mut doc);
        merger.finish(&mut doc);

        assert!(matches!(doc.items[0], DocumentItem::Block(_)));
        assert!(matches!(doc.items[1], DocumentItem::Block(_)));
        assert_eq!(doc.items[2], DocumentItem::PageBreak);
        assert_eq!(doc.items.len(), 4);
        assert_eq!(doc.blocks().nth(1).map(Block::text).unwrap_or_default(), "runs on and ends.");
    }

    #[test]
    fn test_empty_pages_are_skipped() {
        let mut doc = Document::new();
        let mut merger = PageMerger::new();
        merger.push_page(vec![para("One.", 72.0, 0)], &mut doc);
        merger.push_page(Vec::new(), &mut doc);
        merger.push_page(vec![para("Two.", 72.0, 2)], &mut doc);
        merger.finish(&mut doc);
        assert_eq!(doc.page_break_count(), 1);
    }

    #[test]
    fn test_indent_and_kind_must_match() {
        assert!(!can_merge(&para("open", 72.0, 0), &para("far right", 150.0, 1)));
        assert!(!can_merge(&para("open", 72.0, 0), &item("item", 0, 1)));
    }

    #[test]
    fn test_marked_items_never_fuse() {
        assert!(!can_merge(&item("open", 1, 0), &item("more", 1, 1)));
        assert!(!can_merge(&item("open", 0, 0), &item("more", 0, 1)));
    }

    #[test]
    fn test_item_absorbs_continuation_at_text_edge() {
        assert!(can_merge(&item("Bananas and", 0, 0), &para("cherries.", 84.0, 1)));
        assert!(!can_merge(&item("Bananas and", 0, 0), &para("Body text", 72.0, 1)));
        assert!(!can_merge(&item("Bananas.", 0, 0), &para("cherries", 84.0, 1)));

        let mut doc = Document::new();
        let mut merger = PageMerger::new();
        merger.push_page(vec![item("Bananas and", 0, 0)], &mut doc);
        merger.push_page(vec![para("cherries.", 84.0, 1)], &mut doc);
        merger.finish(&mut doc);
        assert_eq!(doc.page_break_count(), 0);
        assert!(matches!(
            doc.blocks().next(),
            Some(Block::ListItem { body, .. }) if body.lines.len() == 2
        ));
    }

    #[test]
    fn test_ends_sentence() {
        assert!(ends_sentence("Done."));
        assert!(ends_sentence("He said \"stop!\""));
        assert!(ends_sentence("(see above.)  "));
        assert!(ends_sentence("終わり。"));
        assert!(!ends_sentence("and so"));
        assert!(!ends_sentence("a list,"));
    }
}
