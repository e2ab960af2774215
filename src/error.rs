//! Error types for pdf2md library.

use std::io;
use thiserror::Error;

/// Result type alias for pdf2md operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// Error exporting an embedded image.
    #[error("Image export error: {0}")]
    ImageExport(String),

    /// Error during rendering (Markdown, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// The conversion options are invalid.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Configuration problems map to `2`, decode and file failures to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            _ => 1,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageExport(err.to_string())
    }
}

/// Invalid values in [`ConversionOptions`](crate::ConversionOptions).
///
/// Reported before any page is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Image format other than png, jpg or jpeg.
    #[error("unsupported image format '{0}' (expected png, jpg or jpeg)")]
    UnsupportedImageFormat(String),

    /// Image DPI must be positive.
    #[error("image DPI must be positive, got {0}")]
    InvalidDpi(u32),

    /// List indent width must be positive.
    #[error("list indent width must be positive, got {0}")]
    InvalidIndentWidth(usize),

    /// Heading size ratio must exceed 1.0.
    #[error("minimum heading size ratio must be greater than 1.0, got {0}")]
    InvalidHeadingRatio(f32),

    /// Heading size threshold must be finite and non-negative.
    #[error("heading font size threshold must be a non-negative number, got {0}")]
    InvalidHeadingThreshold(f32),

    /// Line merge threshold must be finite and non-negative.
    #[error("line merge threshold must be a non-negative number, got {0}")]
    InvalidMergeThreshold(f32),
}
