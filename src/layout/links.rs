//! Hyperlink overlay.
//!
//! Link annotations are rectangles with a target URI. A span belongs to
//! a link when at least half of its area lies inside the annotation.

use crate::model::{LinkAnnotation, Line, Span};

/// Minimum fraction of a span's area that must fall inside an annotation.
pub const MIN_LINK_OVERLAP: f32 = 0.5;

/// Attach link targets to the spans of one page.
///
/// Annotations are applied in page order and a span is claimed by the
/// first annotation that covers it. Adjacent spans claimed by the same
/// annotation with the same style are fused into one span. Returns the
/// number of annotations that matched at least one span.
pub fn map_links(lines: &mut [Line], links: &[LinkAnnotation]) -> usize {
    if links.is_empty() {
        return 0;
    }

    let mut matched = 0;
    // annotation index per span, parallel to `lines`
    let mut owners: Vec<Vec<Option<usize>>> =
        lines.iter().map(|l| vec![None; l.spans.len()]).collect();

    for (index, link) in links.iter().enumerate() {
        let mut hit = false;
        for (line, line_owners) in lines.iter_mut().zip(owners.iter_mut()) {
            for (span, owner) in line.spans.iter_mut().zip(line_owners.iter_mut()) {
                if owner.is_some() || span.bbox.overlap_ratio(&link.bbox) < MIN_LINK_OVERLAP {
                    continue;
                }
                *owner = Some(index);
                span.link = Some(link.uri.clone());
                hit = true;
            }
        }
        if hit {
            matched += 1;
        }
    }

    for (line, line_owners) in lines.iter_mut().zip(owners) {
        fuse_link_spans(line, &line_owners);
    }

    log::debug!("{} of {} link annotations matched text", matched, links.len());
    matched
}

fn fuse_link_spans(line: &mut Line, owners: &[Option<usize>]) {
    if line.spans.len() < 2 {
        return;
    }
    let mut fused: Vec<Span> = Vec::with_capacity(line.spans.len());
    let mut fused_owners: Vec<Option<usize>> = Vec::with_capacity(owners.len());

    for (i, span) in line.spans.iter().enumerate() {
        let owner = owners[i];
        let joinable = owner.is_some()
            && fused_owners.last() == Some(&owner)
            && fused.last().is_some_and(|prev| prev.flags == span.flags);
        if joinable {
            let space = line.needs_space_before(i);
            if let Some(prev) = fused.last_mut() {
                if space {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.bbox = prev.bbox.union(&span.bbox);
            }
        } else {
            fused.push(span.clone());
            fused_owners.push(owner);
        }
    }

    line.spans = fused;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, StyleFlags};

    fn make_span(text: &str, x0: f32, x1: f32) -> Span {
        Span::new(text, Rect::new(x0, 88.0, x1, 100.0), "Helvetica", 12.0)
    }

    fn annotation(x0: f32, x1: f32, uri: &str) -> LinkAnnotation {
        LinkAnnotation {
            bbox: Rect::new(x0, 86.0, x1, 102.0),
            uri: uri.to_string(),
        }
    }

    #[test]
    fn test_link_fuses_adjacent_spans() {
        let mut lines = vec![Line::from_spans(vec![
            make_span("See", 10.0, 28.0),
            make_span("click", 34.0, 64.0),
            make_span("here", 70.0, 94.0),
        ])];
        let matched = map_links(&mut lines, &[annotation(32.0, 96.0, "http://example.com")]);

        assert_eq!(matched, 1);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[0].link, None);
        assert_eq!(lines[0].spans[1].text, "click here");
        assert_eq!(
            lines[0].spans[1].link.as_deref(),
            Some("http://example.com")
        );
    }

    #[test]
    fn test_first_annotation_wins() {
        let mut lines = vec![Line::from_spans(vec![make_span("both", 10.0, 34.0)])];
        map_links(
            &mut lines,
            &[annotation(0.0, 40.0, "http://a"), annotation(0.0, 40.0, "http://b")],
        );
        assert_eq!(lines[0].spans[0].link.as_deref(), Some("http://a"));
    }

    #[test]
    fn test_insufficient_overlap_ignored() {
        let mut lines = vec![Line::from_spans(vec![make_span("edge", 10.0, 50.0)])];
        // covers 10 of 40 points
        let matched = map_links(&mut lines, &[annotation(40.0, 80.0, "http://x")]);
        assert_eq!(matched, 0);
        assert_eq!(lines[0].spans[0].link, None);
    }

    #[test]
    fn test_style_change_keeps_spans_separate() {
        let bold = make_span("bold", 40.0, 64.0).with_flags(StyleFlags::PLAIN.with_bold(true));
        let mut lines = vec![Line::from_spans(vec![make_span("plain", 10.0, 34.0), bold])];
        map_links(&mut lines, &[annotation(0.0, 70.0, "http://x")]);
        assert_eq!(lines[0].spans.len(), 2);
        assert!(lines[0].spans.iter().all(|s| s.link.is_some()));
    }
}
