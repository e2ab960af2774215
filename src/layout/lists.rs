//! List marker recognition and the nesting tracker.
//!
//! The tracker keeps one stack entry per open nesting level, so the stack
//! index of an entry is its level. It lives for the whole document and
//! carries list state across page boundaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ListMarker, MarkerFamily, MarkerKind};

/// Glyphs accepted as bullets.
const BULLET_GLYPHS: &[char] = &[
    '•', '●', '○', '◦', '▪', '▸', '►', '■', '□', '◆', '◇', '▶', '▷', '➤', '➢', '✓', '·', '-', '–',
    '—', '*',
];

/// `1.`, `12)`, `(3)`, `a.`, `B)`, `iv.`, `(XII)`
static ORDERED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\()?(\d{1,3}|[ivxlcdm]{1,7}|[IVXLCDM]{1,7}|[A-Za-z])([.)])(?:\s+|$)")
        .expect("valid ordered marker regex")
});

/// A list marker as written in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerToken {
    Bullet,
    Decimal(u32),
    /// Single letter other than `i`/`I`
    Letter(char),
    Roman { value: u32, upper: bool },
    /// Lone `i` or `I`: roman one, or the ninth letter
    AmbiguousI { upper: bool },
}

impl MarkerToken {
    /// Marker kind once ambiguity is settled against the open list.
    fn resolve(self, open: Option<MarkerKind>) -> MarkerKind {
        match self {
            MarkerToken::Bullet => MarkerKind::Bullet,
            MarkerToken::Decimal(_) => MarkerKind::Decimal,
            MarkerToken::Letter(c) if c.is_ascii_uppercase() => MarkerKind::UpperAlpha,
            MarkerToken::Letter(_) => MarkerKind::LowerAlpha,
            MarkerToken::Roman { upper: true, .. } => MarkerKind::UpperRoman,
            MarkerToken::Roman { upper: false, .. } => MarkerKind::LowerRoman,
            MarkerToken::AmbiguousI { upper } => {
                let lettered = open.is_some_and(|k| k.family() == MarkerFamily::Lettered);
                match (lettered, upper) {
                    (true, true) => MarkerKind::UpperAlpha,
                    (true, false) => MarkerKind::LowerAlpha,
                    (false, true) => MarkerKind::UpperRoman,
                    (false, false) => MarkerKind::LowerRoman,
                }
            }
        }
    }

    /// Whether the token explicitly starts a list (`1`, `a`, `i`) once
    /// resolved to `kind`.
    fn is_restart(self, kind: MarkerKind) -> bool {
        match self {
            MarkerToken::Bullet => false,
            MarkerToken::Decimal(n) => n == 1,
            MarkerToken::Letter(c) => c.eq_ignore_ascii_case(&'a'),
            MarkerToken::Roman { value, .. } => value == 1,
            MarkerToken::AmbiguousI { .. } => kind.family() == MarkerFamily::Numbered,
        }
    }
}

/// A marker found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedMarker {
    pub token: MarkerToken,
    /// Byte length of the marker plus trailing whitespace
    pub len: usize,
}

/// Recognize a list marker at the start of `text`.
pub fn parse_marker(text: &str) -> Option<ParsedMarker> {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();

    let first = trimmed.chars().next()?;
    if BULLET_GLYPHS.contains(&first) {
        let rest = &trimmed[first.len_utf8()..];
        let spaced = rest.is_empty() || rest.starts_with(char::is_whitespace);
        // ASCII bullets need a following space ("-5" is a number, "**" is emphasis).
        if first.is_ascii() && !spaced {
            return None;
        }
        if first == '-' || first == '*' {
            // "- - -" style rules are not list items
            let rule = rest.trim();
            if !rule.is_empty() && rule.chars().all(|c| c == first || c.is_whitespace()) {
                return None;
            }
        }
        let ws = rest.len() - rest.trim_start().len();
        return Some(ParsedMarker {
            token: MarkerToken::Bullet,
            len: lead + first.len_utf8() + ws,
        });
    }

    let caps = ORDERED_MARKER.captures(trimmed)?;
    let open = caps.get(1).is_some();
    let close = caps.get(3).map(|m| m.as_str()).unwrap_or(".");
    if open && close != ")" {
        return None;
    }
    let body = caps.get(2)?.as_str();
    let token = classify_token(body)?;
    let len = lead + caps.get(0)?.end();
    Some(ParsedMarker { token, len })
}

fn classify_token(body: &str) -> Option<MarkerToken> {
    if let Ok(n) = body.parse::<u32>() {
        return Some(MarkerToken::Decimal(n));
    }
    let mut chars = body.chars();
    let first = chars.next()?;
    let upper = first.is_ascii_uppercase();
    if chars.next().is_none() {
        return Some(match first {
            'i' | 'I' => MarkerToken::AmbiguousI { upper },
            c => MarkerToken::Letter(c),
        });
    }
    let value = roman_value(body)?;
    Some(MarkerToken::Roman { value, upper })
}

/// Value of a well-formed roman numeral (either case).
pub fn roman_value(numeral: &str) -> Option<u32> {
    let digit = |c: char| match c.to_ascii_uppercase() {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    };
    let values: Vec<u32> = numeral.chars().map(digit).collect::<Option<_>>()?;
    let mut total = 0;
    for (i, &v) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(&next) if next > v => total -= v as i64,
            _ => total += v as i64,
        }
    }
    let total = u32::try_from(total).ok().filter(|&t| t > 0)?;
    // Reject non-canonical spellings such as "iiii" or "vx".
    (to_roman(total).eq_ignore_ascii_case(numeral)).then_some(total)
}

/// Convert number to Roman numerals.
pub fn to_roman(mut num: u32) -> String {
    let numerals = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut result = String::new();
    for (value, symbol) in numerals {
        while num >= value {
            result.push_str(symbol);
            num -= value;
        }
    }
    result
}

/// Check if text consists of a bullet glyph alone.
pub fn is_bullet_marker(text: &str) -> bool {
    let mut chars = text.trim().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if BULLET_GLYPHS.contains(&c))
}

/// Check if text consists of an ordered marker alone (`1.`, `b)`, `iv.`).
pub fn is_number_marker(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        return true;
    }
    parse_marker(trimmed).is_some_and(|m| m.len == trimmed.len() && m.token != MarkerToken::Bullet)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenList {
    /// Indent (in spaces) of the item that opened the level
    indent: f32,
    kind: MarkerKind,
    ordinal: u32,
}

/// Stack of open list levels.
#[derive(Debug, Clone, Default)]
pub struct ListContext {
    stack: Vec<OpenList>,
}

impl ListContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open levels.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Place a list item and return its nesting level and tracked marker.
    ///
    /// `indent` is measured in spaces from the document's left margin. An
    /// item within half an indent width of an open level joins that level;
    /// otherwise the requested level is `floor(indent / indent_width)`,
    /// clamped to at most one level deeper than the current top.
    pub fn place(
        &mut self,
        token: MarkerToken,
        indent: f32,
        indent_width: usize,
    ) -> (usize, ListMarker) {
        let width = indent_width.max(1) as f32;
        let requested = self
            .stack
            .iter()
            .enumerate()
            .map(|(level, open)| (level, (open.indent - indent).abs()))
            .filter(|&(_, distance)| distance < width / 2.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(level, _)| level)
            .unwrap_or_else(|| (indent.max(0.0) / width).floor() as usize);
        let level = requested.min(self.stack.len());
        if level < requested {
            log::debug!("list level {} clamped to {}", requested, level);
        }

        if level == self.stack.len() {
            let kind = token.resolve(None);
            self.stack.push(OpenList {
                indent,
                kind,
                ordinal: 1,
            });
            return (level, ListMarker::new(kind, 1));
        }

        self.stack.truncate(level + 1);
        let open = &mut self.stack[level];
        let kind = token.resolve(Some(open.kind));

        if kind.family() == open.kind.family() && !token.is_restart(kind) {
            open.ordinal += 1;
            open.kind = kind;
        } else {
            *open = OpenList {
                indent,
                kind,
                ordinal: 1,
            };
        }
        (level, ListMarker::new(open.kind, open.ordinal))
    }

    /// Close every open list.
    pub fn reset(&mut self) {
        self.stack.clear();
    }
}
