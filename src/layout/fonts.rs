//! Document-wide font statistics for heading detection.

use std::collections::BTreeMap;

use crate::model::{size_key, Line};

/// Body size assumed when a document has no text.
pub const FALLBACK_BODY_SIZE: f32 = 12.0;

/// Font size statistics gathered once per document.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Span sizes at 0.1pt resolution with frequency
    size_histogram: BTreeMap<i32, usize>,
    /// Distinct dominant line sizes at 0.1pt resolution
    line_sizes: BTreeMap<i32, usize>,
}

impl FontStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        *self.size_histogram.entry(size_key(size)).or_insert(0) += 1;
    }

    /// Record every span of a line and the line's dominant size.
    pub fn add_line(&mut self, line: &Line) {
        for span in &line.spans {
            self.add_size(span.font_size);
        }
        *self
            .line_sizes
            .entry(size_key(line.dominant_font_size()))
            .or_insert(0) += 1;
    }

    /// Freeze the statistics into heading thresholds.
    pub fn analyze(&self, size_threshold: f32, min_ratio: f32) -> HeadingScale {
        // Ascending keys + last max wins, so reverse for ties to go small.
        let base_size = self
            .size_histogram
            .iter()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(key, _)| *key as f32 / 10.0)
            .unwrap_or(FALLBACK_BODY_SIZE);

        let mut qualifying: Vec<i32> = self
            .line_sizes
            .keys()
            .copied()
            .filter(|&key| qualifies(key as f32 / 10.0, base_size, size_threshold, min_ratio))
            .collect();
        qualifying.sort_unstable_by(|a, b| b.cmp(a));

        log::debug!(
            "base font size {:.1}pt, {} heading size(s)",
            base_size,
            qualifying.len()
        );

        HeadingScale {
            base_size,
            size_threshold,
            min_ratio,
            ranked_sizes: qualifying,
        }
    }
}

fn qualifies(size: f32, base: f32, size_threshold: f32, min_ratio: f32) -> bool {
    base > 0.0 && size / base >= min_ratio && size >= size_threshold
}

/// Heading levels derived from the document's font sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingScale {
    /// Most common span size
    pub base_size: f32,
    size_threshold: f32,
    min_ratio: f32,
    /// Qualifying sizes, largest first
    ranked_sizes: Vec<i32>,
}

impl HeadingScale {
    /// Heading level (1-6) for a line size, or `None` for body text.
    pub fn level_for(&self, size: f32) -> Option<u8> {
        if !qualifies(size, self.base_size, self.size_threshold, self.min_ratio) {
            return None;
        }
        let key = size_key(size);
        let rank = self
            .ranked_sizes
            .iter()
            .position(|&s| s <= key)
            .unwrap_or(self.ranked_sizes.len());
        Some((rank + 1).min(6) as u8)
    }
}
