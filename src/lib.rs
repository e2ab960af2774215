//! # pdf2md
//!
//! PDF to Markdown conversion by layout reconstruction.
//!
//! Decoded pages arrive as positioned text spans with font metadata,
//! embedded images, link annotations and ruling lines. The library groups
//! spans into lines, classifies lines into headings, paragraphs, nested
//! lists, tables and code blocks from font and geometry heuristics,
//! stitches paragraphs that continue across page boundaries and renders
//! the result as Markdown.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf2md::to_markdown;
//!
//! fn main() -> pdf2md::Result<()> {
//!     let markdown = to_markdown("document.pdf")?;
//!     println!("{}", markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## From page snapshots
//!
//! The layout engine does not need a PDF at all:
//!
//! ```
//! use pdf2md::model::{PageSnapshot, Rect, Span};
//! use pdf2md::{ConversionOptions, Converter};
//!
//! let page = PageSnapshot::new(0).with_spans(vec![
//!     Span::new("Title", Rect::new(72.0, 60.0, 160.0, 84.0), "Helvetica-Bold", 24.0),
//!     Span::new("Body text.", Rect::new(72.0, 110.0, 130.0, 122.0), "Helvetica", 12.0),
//! ]);
//! let converter = Converter::new(ConversionOptions::default()).unwrap();
//! let conversion = converter.convert_pages(&[page]).unwrap();
//! assert_eq!(conversion.markdown, "# Title\n\nBody text.");
//! ```
//!
//! ## Features
//!
//! - **Headings** ranked by font size relative to the body text
//! - **Lists** with bullet, decimal, lettered and roman markers, nested by indentation
//! - **Tables** from ruling lines or column-aligned text
//! - **Hyperlinks** from URI link annotations
//! - **Cross-page paragraphs** joined without a page separator
//! - **Images** exported as PNG or JPEG at a chosen resolution
//! - **Parallel batches** using Rayon, one pipeline per document

pub mod convert;
pub mod detect;
pub mod error;
pub mod layout;
pub mod model;
pub mod options;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{Conversion, Converter, ExtractedImage, PipelineContext};
pub use detect::{is_pdf_bytes, sniff_bytes, sniff_path, PdfHeader};
pub use error::{ConfigError, Error, Result};
pub use model::{Block, Document, DocumentItem, PageSnapshot};
pub use options::{ConversionOptions, ImageFormat};
pub use parser::{DocumentSource, LopdfSource};
pub use render::{ExtractionStats, JsonFormat};

use std::path::Path;

/// Convert a PDF file to Markdown with default options.
///
/// # Example
///
/// ```no_run
/// let markdown = pdf2md::to_markdown("document.pdf").unwrap();
/// std::fs::write("output.md", markdown).unwrap();
/// ```
pub fn to_markdown<P: AsRef<Path>>(path: P) -> Result<String> {
    to_markdown_with_options(path, ConversionOptions::default())
}

/// Convert a PDF file to Markdown with custom options.
///
/// # Example
///
/// ```no_run
/// use pdf2md::{to_markdown_with_options, ConversionOptions};
///
/// let options = ConversionOptions::new().with_images(false).with_tables(false);
/// let markdown = to_markdown_with_options("document.pdf", options).unwrap();
/// ```
pub fn to_markdown_with_options<P: AsRef<Path>>(
    path: P,
    options: ConversionOptions,
) -> Result<String> {
    Ok(Converter::new(options)?.convert_file(path)?.markdown)
}

/// Convert PDF bytes to Markdown with default options.
pub fn bytes_to_markdown(data: &[u8]) -> Result<String> {
    Ok(Converter::new(ConversionOptions::default())?
        .convert_bytes(data)?
        .markdown)
}

/// Dump the classified block tree of a PDF file as JSON.
///
/// # Example
///
/// ```no_run
/// use pdf2md::{to_json, JsonFormat};
///
/// let json = to_json("document.pdf", JsonFormat::Pretty).unwrap();
/// std::fs::write("output.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let conversion = Converter::new(ConversionOptions::default())?.convert_file(path)?;
    render::to_json(&conversion.document, format)
}

/// Builder for converting PDF documents.
///
/// # Example
///
/// ```no_run
/// use pdf2md::Pdf2Md;
///
/// let markdown = Pdf2Md::new()
///     .with_image_dir("./images")
///     .with_page_separator("\n\n")
///     .convert("document.pdf")?
///     .markdown;
/// # Ok::<(), pdf2md::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pdf2Md {
    options: ConversionOptions,
}

impl Pdf2Md {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing options.
    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable image export.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.options = self.options.with_images(extract);
        self
    }

    /// Set the directory used in image references.
    pub fn with_image_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.options = self.options.with_image_dir(dir);
        self
    }

    /// Set the exported image format.
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.options = self.options.with_image_format(format);
        self
    }

    /// Render plain text without emphasis markers.
    pub fn without_formatting(mut self) -> Self {
        self.options = self.options.with_formatting(false);
        self
    }

    /// Render link text without link targets.
    pub fn without_links(mut self) -> Self {
        self.options = self.options.with_hyperlinks(false);
        self
    }

    /// Set the page separator.
    pub fn with_page_separator(mut self, separator: impl Into<String>) -> Self {
        self.options = self.options.with_page_separator(separator);
        self
    }

    /// Current options.
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Build a converter, validating the options.
    pub fn build(self) -> Result<Converter> {
        Converter::new(self.options)
    }

    /// Convert a PDF file.
    pub fn convert<P: AsRef<Path>>(self, path: P) -> Result<Conversion> {
        self.build()?.convert_file(path)
    }

    /// Convert PDF bytes.
    pub fn convert_bytes(self, data: &[u8]) -> Result<Conversion> {
        self.build()?.convert_bytes(data)
    }

    /// Convert in-memory page snapshots.
    pub fn convert_pages(self, pages: &[PageSnapshot]) -> Result<Conversion> {
        self.build()?.convert_pages(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chained() {
        let builder = Pdf2Md::new()
            .with_images(false)
            .without_formatting()
            .without_links()
            .with_page_separator("\n***\n");

        assert!(!builder.options().extract_images);
        assert!(!builder.options().detect_bold_italic);
        assert!(!builder.options().preserve_hyperlinks);
        assert_eq!(builder.options().page_separator, "\n***\n");
    }

    #[test]
    fn test_builder_rejects_invalid_options() {
        let options = ConversionOptions::default().with_list_indent(0);
        let result = Pdf2Md::new().with_options(options).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_bytes_empty_data() {
        let result = bytes_to_markdown(&[]);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_bytes_unknown_magic() {
        let data = [0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert!(matches!(bytes_to_markdown(&data), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_bytes_header_only() {
        let result = Pdf2Md::new().convert_bytes(b"%PDF-1.4\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(to_markdown("/no/such/file.pdf"), Err(Error::Io(_))));
    }

    #[test]
    fn test_convert_pages_through_builder() {
        let conversion = Pdf2Md::new().convert_pages(&[]).unwrap();
        assert!(conversion.markdown.is_empty());
    }
}
