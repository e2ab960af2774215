//! Conversion pipeline.
//!
//! A [`Converter`] owns validated options and turns page snapshots into
//! Markdown. Each conversion runs two passes: every page is assembled into
//! lines (with links mapped) and measured for document-wide font
//! statistics, then pages are classified and merged strictly in order
//! through one [`PipelineContext`].
//!
//! # Example
//!
//! ```no_run
//! use pdf2md::{Converter, ConversionOptions};
//!
//! fn main() -> pdf2md::Result<()> {
//!     let converter = Converter::new(ConversionOptions::default().with_image_dir("img"))?;
//!     let conversion = converter.convert_file("document.pdf")?;
//!     println!("{}", conversion.markdown);
//!     Ok(())
//! }
//! ```

pub mod images;

pub use images::{export_image, image_file_name, ExtractedImage};

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::layout::{assemble_lines, map_links, Classifier, FontStatistics, ListContext, PageMerger};
use crate::model::{Block, Document, ImageBlob, ImageRef, Line, PageSnapshot, Ruling};
use crate::options::ConversionOptions;
use crate::parser::{DocumentSource, LopdfSource};
use crate::render::{to_markdown, ExtractionStats};

/// Result of converting one document.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Rendered Markdown
    pub markdown: String,
    /// Classified block tree
    pub document: Document,
    /// Exported images, in reference order
    pub images: Vec<ExtractedImage>,
    /// Extraction statistics
    pub stats: ExtractionStats,
}

/// Mutable state of one document's classification pass.
///
/// Owned by a single conversion and threaded through every page in order.
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// List nesting, carried across pages
    pub lists: ListContext,
    /// Held trailing block awaiting the next page
    pub merger: PageMerger,
    /// Next document-wide table number
    pub next_table: usize,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A page after line assembly, ready for classification.
struct PreparedPage {
    index: usize,
    lines: Vec<Line>,
    rulings: Vec<Ruling>,
    images: Vec<ImageBlob>,
    links: usize,
}

/// Converts page snapshots to Markdown.
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    /// Create a converter, rejecting invalid options before any page is read.
    pub fn new(options: ConversionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert in-memory page snapshots.
    pub fn convert_pages(&self, pages: &[PageSnapshot]) -> Result<Conversion> {
        let prepared = pages.iter().map(|page| self.prepare(page)).collect();
        Ok(self.finish(prepared))
    }

    /// Convert every page of a source, in order.
    pub fn convert_source(&self, source: &dyn DocumentSource) -> Result<Conversion> {
        let mut prepared = Vec::with_capacity(source.page_count());
        for index in 0..source.page_count() {
            let page = source.page(index)?;
            prepared.push(self.prepare(&page));
        }
        Ok(self.finish(prepared))
    }

    /// Convert a PDF file.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<Conversion> {
        let path = path.as_ref();
        log::info!("converting {}", path.display());
        let source = LopdfSource::open(path)?;
        self.convert_source(&source)
    }

    /// Convert a PDF held in memory.
    pub fn convert_bytes(&self, data: &[u8]) -> Result<Conversion> {
        let source = LopdfSource::from_bytes(data)?;
        self.convert_source(&source)
    }

    /// Convert several PDF files in parallel.
    ///
    /// Every document gets its own pipeline; results keep input order and
    /// a failure affects only its own entry.
    pub fn convert_files<P>(&self, paths: &[P]) -> Vec<(PathBuf, Result<Conversion>)>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                (path.to_path_buf(), self.convert_file(path))
            })
            .collect()
    }

    fn prepare(&self, page: &PageSnapshot) -> PreparedPage {
        let mut lines = assemble_lines(&page.spans, self.options.line_merge_threshold);
        let links = if self.options.preserve_hyperlinks {
            map_links(&mut lines, &page.links)
        } else {
            0
        };
        PreparedPage {
            index: page.index,
            lines,
            rulings: page.rulings.clone(),
            images: if self.options.extract_images {
                page.images.clone()
            } else {
                Vec::new()
            },
            links,
        }
    }

    fn finish(&self, pages: Vec<PreparedPage>) -> Conversion {
        let mut font_stats = FontStatistics::new();
        for line in pages.iter().flat_map(|p| &p.lines) {
            font_stats.add_line(line);
        }
        let scale = font_stats.analyze(
            self.options.heading_font_size_threshold,
            self.options.min_heading_size_ratio,
        );
        let left_margin = pages
            .iter()
            .flat_map(|p| p.lines.iter().map(Line::x0))
            .reduce(f32::min);
        let classifier = Classifier::new(&self.options, &scale).with_left_margin(left_margin);

        let mut ctx = PipelineContext::new();
        let mut document = Document::new();
        let mut images = Vec::new();
        let mut stats = ExtractionStats::new();
        stats.page_count = pages.len() as u32;

        for page in &pages {
            let mut blocks = classifier.classify_page(
                page.index,
                &page.lines,
                &page.rulings,
                &mut ctx.lists,
                &mut ctx.next_table,
            );
            self.place_images(page, &mut blocks, &mut images);
            stats.link_count += page.links as u32;
            ctx.merger.push_page(blocks, &mut document);
        }
        ctx.merger.finish(&mut document);
        ctx.lists.reset();

        let markdown = to_markdown(&document, &self.options);
        let block_stats = ExtractionStats::from_document(&document);
        stats.merge(&block_stats);
        stats.merge_count = ctx.merger.merge_count() as u32;
        stats.count_text(&markdown);

        log::info!(
            "converted {} page(s): {} heading(s), {} paragraph(s), {} table(s), {} image(s)",
            stats.page_count,
            stats.heading_count,
            stats.paragraph_count,
            stats.table_count,
            stats.image_count
        );

        Conversion {
            markdown,
            document,
            images,
            stats,
        }
    }

    /// Export a page's images and insert references by vertical position.
    fn place_images(
        &self,
        page: &PreparedPage,
        blocks: &mut Vec<Block>,
        exported: &mut Vec<ExtractedImage>,
    ) {
        let mut number = 0;
        for blob in &page.images {
            if blob.data.is_empty() {
                log::debug!("page {}: skipping image without data", page.index + 1);
                continue;
            }
            number += 1;
            let image = export_image(blob, page.index, number, &self.options);
            let top = blob.bbox.y0;
            let at = blocks
                .iter()
                .position(|b| !matches!(b, Block::Image(_)) && b.bbox().y0 > top)
                .unwrap_or(blocks.len());
            blocks.insert(
                at,
                Block::Image(ImageRef {
                    path: image.path.clone(),
                    page: page.index,
                    bbox: blob.bbox,
                }),
            );
            exported.push(image);
        }
    }
}

/// Convert in-memory page snapshots with the given options.
pub fn convert_pages(pages: &[PageSnapshot], options: ConversionOptions) -> Result<Conversion> {
    Converter::new(options)?.convert_pages(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};
    use crate::model::{NativeImageFormat, Rect, Span};

    fn span(text: &str, x: f32, baseline: f32, size: f32) -> Span {
        let width = text.chars().count() as f32 * size * 0.5;
        Span::new(
            text,
            Rect::new(x, baseline - size, x + width, baseline),
            "Helvetica",
            size,
        )
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = Converter::new(ConversionOptions::default().with_image_dpi(0));
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidDpi(0)))));
    }

    #[test]
    fn test_empty_input() {
        let conversion = convert_pages(&[], ConversionOptions::default()).unwrap();
        assert_eq!(conversion.markdown, "");
        assert!(conversion.document.is_empty());
        assert_eq!(conversion.stats.page_count, 0);
    }

    #[test]
    fn test_blank_pages_leave_no_separator() {
        let pages = vec![
            PageSnapshot::new(0).with_spans(vec![span("Alpha.", 72.0, 100.0, 12.0)]),
            PageSnapshot::new(1),
            PageSnapshot::new(2).with_spans(vec![span("Beta.", 72.0, 100.0, 12.0)]),
        ];
        let conversion = convert_pages(&pages, ConversionOptions::default()).unwrap();
        assert_eq!(conversion.markdown, "Alpha.\n\n---\n\nBeta.");
        assert_eq!(conversion.stats.page_count, 3);
    }

    #[test]
    fn test_image_inserted_by_position() {
        let blob = ImageBlob {
            bbox: Rect::new(72.0, 150.0, 144.0, 222.0),
            data: vec![200; 4 * 4 * 3],
            format: NativeImageFormat::Raw {
                width: 4,
                height: 4,
                bits_per_component: 8,
                components: 3,
            },
        };
        let page = PageSnapshot::new(0)
            .with_spans(vec![
                span("Above the picture.", 72.0, 100.0, 12.0),
                span("Below the picture.", 72.0, 300.0, 12.0),
            ])
            .with_images(vec![blob]);

        let conversion =
            convert_pages(std::slice::from_ref(&page), ConversionOptions::default()).unwrap();
        assert_eq!(
            conversion.markdown,
            "Above the picture.\n\n![](page1_img1.png)\n\nBelow the picture."
        );
        assert_eq!(conversion.images.len(), 1);
        assert_eq!(conversion.images[0].file_name, "page1_img1.png");

        let options = ConversionOptions::default().with_images(false);
        let conversion = convert_pages(&[page], options).unwrap();
        assert!(conversion.images.is_empty());
        assert!(!conversion.markdown.contains("!["));
    }

    #[test]
    fn test_source_and_pages_agree() {
        let pages = vec![PageSnapshot::new(0).with_spans(vec![
            span("Heading", 72.0, 80.0, 24.0),
            span("Body text here.", 72.0, 120.0, 12.0),
        ])];
        let converter = Converter::new(ConversionOptions::default()).unwrap();
        let from_pages = converter.convert_pages(&pages).unwrap();
        let from_source = converter.convert_source(&pages).unwrap();
        assert_eq!(from_pages.markdown, from_source.markdown);
        assert_eq!(from_pages.markdown, "# Heading\n\nBody text here.");
    }

    #[test]
    fn test_list_state_does_not_leak_between_conversions() {
        let pages = vec![PageSnapshot::new(0).with_spans(vec![
            span("1. Alpha", 72.0, 100.0, 12.0),
            span("2. Beta", 72.0, 114.0, 12.0),
        ])];
        let converter = Converter::new(ConversionOptions::default()).unwrap();
        let first = converter.convert_pages(&pages).unwrap();
        let second = converter.convert_pages(&pages).unwrap();
        assert_eq!(first.markdown, "1. Alpha\n2. Beta");
        assert_eq!(second.markdown, first.markdown);
    }

    #[test]
    fn test_convert_files_reports_each_failure() {
        let converter = Converter::new(ConversionOptions::default()).unwrap();
        let results = converter.convert_files(&["/nonexistent/a.pdf", "/nonexistent/b.pdf"]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, PathBuf::from("/nonexistent/a.pdf"));
        assert!(results.iter().all(|(_, r)| matches!(r, Err(Error::Io(_)))));
    }
}
