//! Content stream interpreter.
//!
//! Walks a page's decoded operators and records what the layout engine
//! needs: positioned text spans, image placements and straight rulings.
//! Coordinates are converted to a top-left origin so that `y` grows down
//! the page.

use std::collections::HashMap;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue,
};
use crate::error::Result;
use crate::model::{
    is_spaceless_script_char, ImageBlob, LinkAnnotation, PageSnapshot, Rect, Ruling, Span,
    StyleFlags,
};

/// Ascender height as a fraction of the font size.
const ASCENT: f32 = 0.8;
/// Descender depth as a fraction of the font size.
const DESCENT: f32 = 0.2;
/// TJ adjustment (1/1000 em) treated as a word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;
/// Filled rectangles at most this thick are treated as rules.
const MAX_RULE_THICKNESS: f32 = 3.0;
/// Guard against unbalanced `q` operators.
const MAX_STATE_DEPTH: usize = 64;

/// A 2D affine transform in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit vertical vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn from_operands(ops: &[PdfValue]) -> Option<Matrix> {
        match numbers(ops).as_slice() {
            [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill_color: u32,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_color: 0,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Path segments collected between construction and painting operators.
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<((f32, f32), (f32, f32))>,
    rects: Vec<Rect>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn clear(&mut self) {
        *self = PathBuilder::default();
    }
}

/// Interprets one page's content stream into a [`PageSnapshot`].
pub struct PageInterpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page: PageId,
    media: Rect,
    fonts: HashMap<Vec<u8>, BackendFontInfo>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: PathBuilder,
    snapshot: PageSnapshot,
}

impl<'a, B: PdfBackend + ?Sized> PageInterpreter<'a, B> {
    /// Prepare an interpreter for `page`, loading its font metrics.
    pub fn new(backend: &'a B, page: PageId, index: usize) -> Result<Self> {
        let media = backend.media_box(page);
        let fonts = backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        let mut snapshot = PageSnapshot::new(index);
        snapshot.width = media.width();
        snapshot.height = media.height();
        Ok(Self {
            backend,
            page,
            media,
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: PathBuilder::default(),
            snapshot,
        })
    }

    /// Decode the page's content and annotations.
    pub fn run(self) -> Result<PageSnapshot> {
        let data = self.backend.page_content(self.page)?;
        let ops = if data.is_empty() {
            Vec::new()
        } else {
            self.backend.decode_content(&data)?
        };
        Ok(self.interpret(&ops))
    }

    /// Interpret already-decoded operators.
    pub fn interpret(mut self, ops: &[ContentOp]) -> PageSnapshot {
        for op in ops {
            self.apply(op);
        }
        let links: Vec<LinkAnnotation> = self
            .backend
            .page_links(self.page)
            .into_iter()
            .map(|link| LinkAnnotation {
                bbox: self.to_page_rect(link.rect),
                uri: link.uri,
            })
            .collect();
        self.snapshot.links = links;
        log::debug!(
            "page {}: {} spans, {} images, {} links, {} rulings",
            self.snapshot.index + 1,
            self.snapshot.spans.len(),
            self.snapshot.images.len(),
            self.snapshot.links.len(),
            self.snapshot.rulings.len()
        );
        self.snapshot
    }

    fn apply(&mut self, op: &ContentOp) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => {
                if self.stack.len() < MAX_STATE_DEPTH {
                    self.stack.push(self.state.clone());
                }
            }
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }

            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let [PdfValue::Name(name), size] = operands {
                    self.state.font = Some(name.clone());
                    self.state.font_size = get_number_from_value(size).unwrap_or(0.0);
                }
            }
            "Td" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    self.next_line(*tx, *ty);
                }
            }
            "TD" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    self.state.leading = -*ty;
                    self.next_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(0.0, -self.state.leading),
            "TL" => set_number(operands, &mut self.state.leading),
            "Tc" => set_number(operands, &mut self.state.char_spacing),
            "Tw" => set_number(operands, &mut self.state.word_spacing),
            "Ts" => set_number(operands, &mut self.state.rise),
            "Tz" => {
                if let Some(scale) = operands.first().and_then(get_number_from_value) {
                    self.state.horizontal_scale = scale / 100.0;
                }
            }
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = operands.first() {
                    self.show_text(std::slice::from_ref(&PdfValue::Str(bytes.clone())));
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = operands.first() {
                    self.show_text(items);
                }
            }
            "'" => {
                self.next_line(0.0, -self.state.leading);
                if let Some(PdfValue::Str(bytes)) = operands.first() {
                    self.show_text(std::slice::from_ref(&PdfValue::Str(bytes.clone())));
                }
            }
            "\"" => {
                if let [aw, ac, PdfValue::Str(bytes)] = operands {
                    self.state.word_spacing = get_number_from_value(aw).unwrap_or(0.0);
                    self.state.char_spacing = get_number_from_value(ac).unwrap_or(0.0);
                    self.next_line(0.0, -self.state.leading);
                    self.show_text(std::slice::from_ref(&PdfValue::Str(bytes.clone())));
                }
            }

            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = fill_color(&numbers(operands)) {
                    self.state.fill_color = color;
                }
            }

            "m" => {
                if let [x, y] = numbers(operands).as_slice() {
                    let p = self.state.ctm.apply(*x, *y);
                    self.path.move_to(p);
                }
            }
            "l" => {
                if let [x, y] = numbers(operands).as_slice() {
                    let p = self.state.ctm.apply(*x, *y);
                    self.path.line_to(p);
                }
            }
            "c" | "v" | "y" => {
                // Curves never form rulings; only the end point matters.
                let values = numbers(operands);
                if let [.., x, y] = values.as_slice() {
                    let p = self.state.ctm.apply(*x, *y);
                    self.path.current = Some(p);
                }
            }
            "re" => {
                if let [x, y, w, h] = numbers(operands).as_slice() {
                    let ctm = self.state.ctm;
                    let (x0, y0) = ctm.apply(*x, *y);
                    let (x1, y1) = ctm.apply(x + w, y + h);
                    self.path.rects.push(Rect::new(x0, y0, x1, y1));
                    self.path.move_to((x0, y0));
                }
            }
            "h" => self.path.close(),
            "S" | "s" => {
                if op.operator == "s" {
                    self.path.close();
                }
                self.paint(true, false);
            }
            "f" | "F" | "f*" => self.paint(false, true),
            "B" | "B*" | "b" | "b*" => {
                if op.operator.starts_with('b') {
                    self.path.close();
                }
                self.paint(true, true);
            }
            "n" => self.path.clear(),

            "Do" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    self.place_image(name);
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Show strings (and TJ adjustments) as one span.
    fn show_text(&mut self, items: &[PdfValue]) {
        let Some(font_name) = self.state.font.clone() else {
            return;
        };
        let font = self
            .fonts
            .get(&font_name)
            .cloned()
            .unwrap_or_else(|| BackendFontInfo::named(&font_name, "Unknown"));
        let font_size = self.state.font_size;
        let h_scale = self.state.horizontal_scale;

        let start = self.text_matrix;
        let mut text = String::new();
        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    text.push_str(&self.backend.decode_text(self.page, &font_name, bytes));
                    let mut advance = 0.0;
                    for code in font.codes(bytes) {
                        advance += font.glyph_width(code) / 1000.0 * font_size
                            + self.state.char_spacing;
                        if !font.two_byte && code == 32 {
                            advance += self.state.word_spacing;
                        }
                    }
                    self.advance(advance * h_scale);
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let n = get_number_from_value(item).unwrap_or(0.0);
                    self.advance(-n / 1000.0 * font_size * h_scale);
                    if -n > TJ_SPACE_THRESHOLD {
                        push_word_space(&mut text);
                    }
                }
                _ => {}
            }
        }

        if text.trim().is_empty() {
            return;
        }

        let rise = self.state.rise;
        let start_device = start.then(&self.state.ctm);
        let end_device = self.text_matrix.then(&self.state.ctm);
        let (x_start, y_base) = start_device.apply(0.0, rise);
        let (x_end, _) = end_device.apply(0.0, rise);
        let size = (font_size * start_device.vertical_scale()).abs();

        let bbox = self.to_page_rect(Rect::new(
            x_start,
            y_base - DESCENT * size,
            x_end.max(x_start + size * 0.1),
            y_base + ASCENT * size,
        ));

        let flags = StyleFlags::from_font_name(&font.base_font);
        let flags = StyleFlags {
            bold: flags.bold || font.force_bold,
            italic: flags.italic || font.italic,
            monospace: flags.monospace || font.fixed_pitch,
        };
        let span = Span::new(text, bbox, font.base_font.clone(), size)
            .with_flags(flags)
            .with_color(self.state.fill_color);
        self.snapshot.spans.push(span);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    fn paint(&mut self, stroke: bool, fill: bool) {
        let path = std::mem::take(&mut self.path);
        if stroke {
            for (from, to) in &path.segments {
                self.push_ruling(*from, *to);
            }
            for rect in &path.rects {
                let corners = [
                    (rect.x0, rect.y0),
                    (rect.x1, rect.y0),
                    (rect.x1, rect.y1),
                    (rect.x0, rect.y1),
                ];
                for i in 0..4 {
                    self.push_ruling(corners[i], corners[(i + 1) % 4]);
                }
            }
        }
        if fill {
            for rect in &path.rects {
                if rect.height() <= MAX_RULE_THICKNESS && rect.width() > rect.height() {
                    let y = rect.center_y();
                    self.push_ruling((rect.x0, y), (rect.x1, y));
                } else if rect.width() <= MAX_RULE_THICKNESS && rect.height() > rect.width() {
                    let x = rect.center_x();
                    self.push_ruling((x, rect.y0), (x, rect.y1));
                }
            }
        }
    }

    fn push_ruling(&mut self, from: (f32, f32), to: (f32, f32)) {
        let (x0, y0) = self.to_page_point(from);
        let (x1, y1) = self.to_page_point(to);
        self.snapshot.rulings.push(Ruling::new(x0, y0, x1, y1));
    }

    fn place_image(&mut self, name: &[u8]) {
        let Some(image) = self.backend.page_image(self.page, name) else {
            log::debug!(
                "skipping non-image XObject /{}",
                String::from_utf8_lossy(name)
            );
            return;
        };
        let ctm = self.state.ctm;
        let corners = [
            ctm.apply(0.0, 0.0),
            ctm.apply(1.0, 0.0),
            ctm.apply(0.0, 1.0),
            ctm.apply(1.0, 1.0),
        ];
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let bbox = self.to_page_rect(Rect::new(x0, y0, x1, y1));
        self.snapshot.images.push(ImageBlob {
            bbox,
            data: image.data,
            format: image.format,
        });
    }

    fn to_page_point(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x - self.media.x0, self.media.y1 - y)
    }

    /// Convert a user-space rectangle to top-left page coordinates.
    fn to_page_rect(&self, rect: Rect) -> Rect {
        let (x0, y0) = self.to_page_point((rect.x0, rect.y1));
        let (x1, y1) = self.to_page_point((rect.x1, rect.y0));
        Rect::new(x0, y0, x1, y1)
    }
}

/// Interpret one page of `backend` into a snapshot.
pub fn interpret_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page: PageId,
    index: usize,
) -> Result<PageSnapshot> {
    PageInterpreter::new(backend, page, index)?.run()
}

fn numbers(operands: &[PdfValue]) -> Vec<f32> {
    operands.iter().filter_map(get_number_from_value).collect()
}

fn set_number(operands: &[PdfValue], target: &mut f32) {
    if let Some(value) = operands.first().and_then(get_number_from_value) {
        *target = value;
    }
}

fn push_word_space(text: &mut String) {
    match text.chars().last() {
        Some(c) if c != ' ' && c != '\u{00A0}' && !is_spaceless_script_char(c) => {
            text.push(' ')
        }
        _ => {}
    }
}

/// Pack gray, RGB or CMYK operands as 0xRRGGBB.
fn fill_color(values: &[f32]) -> Option<u32> {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    let (r, g, b) = match values {
        [gray] => (*gray, *gray, *gray),
        [r, g, b] => (*r, *g, *b),
        [c, m, y, k] => (
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        ),
        _ => return None,
    };
    Some(channel(r) << 16 | channel(g) << 8 | channel(b))
}

#[cfg(test)]
mod tests {
    use super::super::backend::{BackendImage, BackendLink};
    use super::*;
    use crate::model::NativeImageFormat;
    use std::collections::BTreeMap;

    /// In-memory backend serving pre-decoded operators.
    struct FakeBackend {
        fonts: Vec<BackendFontInfo>,
        ops: Vec<ContentOp>,
        links: Vec<BackendLink>,
    }

    impl FakeBackend {
        fn new(ops: Vec<ContentOp>) -> Self {
            let mut helvetica = BackendFontInfo::named(b"F1", "ABCDEF+Helvetica");
            helvetica.first_char = 32;
            helvetica.widths = vec![250.0; 95];
            let mut courier = BackendFontInfo::named(b"F2", "Courier");
            courier.fixed_pitch = true;
            Self {
                fonts: vec![helvetica, courier],
                ops,
                links: Vec::new(),
            }
        }
    }

    impl PdfBackend for FakeBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }

        fn media_box(&self, _page: PageId) -> Rect {
            Rect::new(0.0, 0.0, 600.0, 800.0)
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(self.fonts.clone())
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
            Ok(b"ops".to_vec())
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(self.ops.clone())
        }

        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            super::super::backend::decode_text_simple(bytes)
        }

        fn page_image(&self, _page: PageId, name: &[u8]) -> Option<BackendImage> {
            (name == b"Im1").then(|| BackendImage {
                data: vec![0xFF, 0xD8],
                format: NativeImageFormat::Jpeg,
            })
        }

        fn page_links(&self, _page: PageId) -> Vec<BackendLink> {
            self.links.clone()
        }
    }

    fn num(v: f32) -> PdfValue {
        PdfValue::Real(v)
    }

    fn name(n: &str) -> PdfValue {
        PdfValue::Name(n.as_bytes().to_vec())
    }

    fn string(s: &str) -> PdfValue {
        PdfValue::Str(s.as_bytes().to_vec())
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp::new(operator, operands)
    }

    fn run(backend: &FakeBackend) -> PageSnapshot {
        interpret_page(backend, (1, 0), 0).unwrap()
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 5.0);
        // Scale first, then translate
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        // Translate first, then scale
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_text_position_and_flip() {
        let backend = FakeBackend::new(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(10.0)]),
            op("Td", vec![num(72.0), num(700.0)]),
            op("Tj", vec![string("Hello")]),
            op("ET", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.width, 600.0);
        assert_eq!(page.spans.len(), 1);

        let span = &page.spans[0];
        assert_eq!(span.text, "Hello");
        assert_eq!(span.font_name, "Helvetica");
        assert_eq!(span.font_size, 10.0);
        assert!((span.bbox.x0 - 72.0).abs() < 1e-3);
        // Five glyphs of 250/1000 em at 10pt
        assert!((span.bbox.x1 - 84.5).abs() < 1e-3);
        // Baseline at user y=700 becomes 100 from the top, plus descent
        assert!((span.baseline() - 102.0).abs() < 1e-3);
        assert!((span.bbox.y0 - 92.0).abs() < 1e-3);
    }

    #[test]
    fn test_tj_word_break() {
        let backend = FakeBackend::new(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(12.0)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    string("Hello"),
                    PdfValue::Integer(-300),
                    string("World"),
                    PdfValue::Integer(-50),
                    string("!"),
                ])],
            ),
            op("ET", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.spans[0].text, "Hello World!");
    }

    #[test]
    fn test_leading_and_next_line() {
        let backend = FakeBackend::new(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(10.0)]),
            op("TL", vec![num(14.0)]),
            op("Td", vec![num(50.0), num(700.0)]),
            op("Tj", vec![string("one")]),
            op("T*", vec![]),
            op("Tj", vec![string("two")]),
            op("'", vec![string("three")]),
            op("ET", vec![]),
        ]);
        let page = run(&backend);
        let baselines: Vec<f32> = page.spans.iter().map(|s| s.baseline()).collect();
        assert_eq!(baselines.len(), 3);
        assert!((baselines[1] - baselines[0] - 14.0).abs() < 1e-3);
        assert!((baselines[2] - baselines[1] - 14.0).abs() < 1e-3);
        assert!(page.spans.iter().all(|s| (s.bbox.x0 - 50.0).abs() < 1e-3));
    }

    #[test]
    fn test_ctm_scales_font_size() {
        let backend = FakeBackend::new(vec![
            op("q", vec![]),
            op("cm", vec![num(2.0), num(0.0), num(0.0), num(2.0), num(0.0), num(0.0)]),
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(12.0)]),
            op("Tj", vec![string("Big")]),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(12.0)]),
            op("Tj", vec![string("Small")]),
            op("ET", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.spans[0].font_size, 24.0);
        assert_eq!(page.spans[1].font_size, 12.0);
    }

    #[test]
    fn test_style_and_color() {
        let backend = FakeBackend::new(vec![
            op("rg", vec![num(1.0), num(0.0), num(0.0)]),
            op("BT", vec![]),
            op("Tf", vec![name("F2"), num(10.0)]),
            op("Tj", vec![string("code")]),
            op("ET", vec![]),
        ]);
        let page = run(&backend);
        let span = &page.spans[0];
        assert!(span.flags.monospace);
        assert_eq!(span.color, Some(0xFF0000));
    }

    #[test]
    fn test_blank_text_is_skipped() {
        let backend = FakeBackend::new(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), num(10.0)]),
            op("Tj", vec![string("   ")]),
            op("ET", vec![]),
        ]);
        assert!(run(&backend).spans.is_empty());
    }

    #[test]
    fn test_stroked_lines_and_thin_fills_become_rulings() {
        let backend = FakeBackend::new(vec![
            op("m", vec![num(10.0), num(700.0)]),
            op("l", vec![num(300.0), num(700.0)]),
            op("S", vec![]),
            op("re", vec![num(10.0), num(600.0), num(290.0), num(0.5)]),
            op("f", vec![]),
            op("re", vec![num(10.0), num(100.0), num(200.0), num(200.0)]),
            op("f", vec![]),
            op("re", vec![num(0.0), num(0.0), num(10.0), num(10.0)]),
            op("n", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.rulings.len(), 2);
        assert!(page.rulings.iter().all(|r| r.is_horizontal(1.0)));
        assert!((page.rulings[0].start.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_stroked_rectangle_has_four_edges() {
        let backend = FakeBackend::new(vec![
            op("re", vec![num(100.0), num(100.0), num(50.0), num(20.0)]),
            op("S", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.rulings.len(), 4);
        let vertical = page.rulings.iter().filter(|r| r.is_vertical(1.0)).count();
        assert_eq!(vertical, 2);
    }

    #[test]
    fn test_image_placement() {
        let backend = FakeBackend::new(vec![
            op("q", vec![]),
            op(
                "cm",
                vec![num(200.0), num(0.0), num(0.0), num(100.0), num(50.0), num(600.0)],
            ),
            op("Do", vec![name("Im1")]),
            op("Do", vec![name("Form1")]),
            op("Q", vec![]),
        ]);
        let page = run(&backend);
        assert_eq!(page.images.len(), 1);
        assert_eq!(page.images[0].bbox, Rect::new(50.0, 100.0, 250.0, 200.0));
        assert_eq!(page.images[0].format, NativeImageFormat::Jpeg);
    }

    #[test]
    fn test_links_are_flipped() {
        let mut backend = FakeBackend::new(vec![]);
        backend.links.push(BackendLink {
            rect: Rect::new(72.0, 690.0, 150.0, 710.0),
            uri: "http://example.com".into(),
        });
        let page = run(&backend);
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].bbox, Rect::new(72.0, 90.0, 150.0, 110.0));
        assert_eq!(page.links[0].uri, "http://example.com");
    }

    #[test]
    fn test_fill_color_spaces() {
        assert_eq!(fill_color(&[0.0]), Some(0x000000));
        assert_eq!(fill_color(&[1.0]), Some(0xFFFFFF));
        assert_eq!(fill_color(&[0.0, 0.0, 1.0]), Some(0x0000FF));
        assert_eq!(fill_color(&[0.0, 0.0, 0.0, 1.0]), Some(0x000000));
        assert_eq!(fill_color(&[0.5, 0.5]), None);
    }
}
