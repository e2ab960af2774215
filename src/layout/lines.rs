//! Span-to-line assembly.
//!
//! Raw spans arrive in content-stream order, which is rarely reading
//! order. Assembly drops malformed spans, normalizes their text and
//! groups them into baseline bands, top to bottom and left to right.

use unicode_normalization::UnicodeNormalization;

use crate::model::{Line, Span};

/// Horizontal overlap (pt) tolerated between spans of one line.
const OVERLAP_TOLERANCE: f32 = 0.5;

/// Group one page's spans into visual lines.
///
/// A span joins an open line when its baseline lies within
/// `merge_threshold` of the line's first baseline and its horizontal
/// range does not collide with a span already in that line.
pub fn assemble_lines(spans: &[Span], merge_threshold: f32) -> Vec<Line> {
    let mut cleaned: Vec<Span> = spans.iter().filter_map(clean_span).collect();
    if cleaned.is_empty() {
        return Vec::new();
    }

    cleaned.sort_by(|a, b| {
        a.baseline()
            .total_cmp(&b.baseline())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    // (anchor baseline, spans)
    let mut bands: Vec<(f32, Vec<Span>)> = Vec::new();
    for span in cleaned {
        let baseline = span.baseline();
        let slot = bands
            .iter()
            .enumerate()
            .rev()
            .take_while(|(_, (anchor, _))| baseline - anchor <= merge_threshold)
            .find(|(_, (_, members))| {
                members
                    .iter()
                    .all(|m| !m.bbox.overlaps_horizontally(&span.bbox, OVERLAP_TOLERANCE))
            })
            .map(|(i, _)| i);

        match slot {
            Some(i) => bands[i].1.push(span),
            None => bands.push((baseline, vec![span])),
        }
    }

    let lines: Vec<Line> = bands
        .into_iter()
        .map(|(_, members)| Line::from_spans(members))
        .filter(|line| !line.text().trim().is_empty())
        .collect();

    log::debug!("assembled {} spans into {} lines", spans.len(), lines.len());
    lines
}

/// Normalize a span's text, or drop the span if it cannot be placed.
fn clean_span(span: &Span) -> Option<Span> {
    if span.bbox.is_degenerate() || !span.font_size.is_finite() || span.font_size <= 0.0 {
        return None;
    }
    let text = normalize_text(&span.text);
    if text.trim().is_empty() {
        return None;
    }
    let mut cleaned = span.clone();
    cleaned.text = text;
    Some(cleaned)
}

/// NFC-normalize, expand typographic ligatures and strip glyphs that
/// carry no text (replacement characters, private-use code points).
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match c {
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{FB05}' | '\u{FB06}' => out.push_str("st"),
            '\u{FFFD}' | '\u{0000}' => {}
            '\u{E000}'..='\u{F8FF}' => {}
            '\u{00A0}' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn make_span(text: &str, x: f32, baseline: f32) -> Span {
        let width = text.chars().count() as f32 * 6.0;
        Span::new(
            text,
            Rect::new(x, baseline - 12.0, x + width, baseline),
            "Helvetica",
            12.0,
        )
    }

    #[test]
    fn test_groups_by_baseline() {
        let spans = vec![
            make_span("second", 10.0, 130.0),
            make_span("world", 50.0, 101.5),
            make_span("Hello", 10.0, 100.0),
        ];
        let lines = assemble_lines(&spans, 5.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_overlapping_spans_split_lines() {
        // Same band, same x range: must not be fused into one line.
        let spans = vec![make_span("upper", 10.0, 100.0), make_span("lower", 12.0, 103.0)];
        let lines = assemble_lines(&spans, 5.0);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_drops_malformed_spans() {
        let mut zero_area = make_span("ghost", 10.0, 100.0);
        zero_area.bbox.x1 = zero_area.bbox.x0;
        let empty = make_span("", 10.0, 120.0);
        let blank = make_span("   ", 10.0, 140.0);
        let lines = assemble_lines(&[zero_area, empty, blank, make_span("kept", 10.0, 160.0)], 5.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "kept");
    }

    #[test]
    fn test_zero_threshold_requires_exact_baseline() {
        let spans = vec![make_span("a", 10.0, 100.0), make_span("b", 40.0, 100.5)];
        assert_eq!(assemble_lines(&spans, 0.0).len(), 2);
        assert_eq!(assemble_lines(&spans, 1.0).len(), 1);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("\u{FB01}nal e\u{FB03}cient"), "final efficient");
        assert_eq!(normalize_text("a\u{FFFD}b\u{E001}c"), "abc");
        assert_eq!(normalize_text("e\u{0301}"), "\u{00E9}");
    }
}
