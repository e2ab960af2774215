//! Conversion options and configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default separator emitted between pages.
pub const DEFAULT_PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Output encoding for extracted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG (`jpg` and `jpeg` are both accepted)
    Jpeg,
}

impl ImageFormat {
    /// File extension used for exported images.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            _ => Err(ConfigError::UnsupportedImageFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options controlling layout reconstruction and Markdown output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Export embedded images and reference them from the Markdown
    pub extract_images: bool,

    /// Directory prefix for image references (None = bare file names)
    pub image_output_dir: Option<PathBuf>,

    /// Encoding for exported images
    pub image_format: ImageFormat,

    /// Resolution used to size exported images
    pub image_dpi: u32,

    /// Render link annotations as Markdown links
    pub preserve_hyperlinks: bool,

    /// Promote large lines to headings
    pub detect_headings: bool,

    /// Recognize list markers
    pub detect_lists: bool,

    /// Emit `*`/`**` emphasis from span styles
    pub detect_bold_italic: bool,

    /// Recognize ruled and column-aligned tables
    pub detect_tables: bool,

    /// Minimum absolute size (pt) for a heading
    pub heading_font_size_threshold: f32,

    /// Minimum size relative to the body text for a heading
    pub min_heading_size_ratio: f32,

    /// Vertical tolerance (pt) for line grouping and paragraph merging
    pub line_merge_threshold: f32,

    /// Indent width (in spaces) of one list nesting level
    pub list_indent_spaces: usize,

    /// Text emitted between pages
    pub page_separator: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            extract_images: true,
            image_output_dir: None,
            image_format: ImageFormat::Png,
            image_dpi: 150,
            preserve_hyperlinks: true,
            detect_headings: true,
            detect_lists: true,
            detect_bold_italic: true,
            detect_tables: true,
            heading_font_size_threshold: 14.0,
            min_heading_size_ratio: 1.2,
            line_merge_threshold: 5.0,
            list_indent_spaces: 4,
            page_separator: DEFAULT_PAGE_SEPARATOR.to_string(),
        }
    }
}

impl ConversionOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable image export.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Set the directory used in image references.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_output_dir = Some(dir.into());
        self
    }

    /// Set the image encoding.
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Set the image resolution.
    pub fn with_image_dpi(mut self, dpi: u32) -> Self {
        self.image_dpi = dpi;
        self
    }

    /// Enable or disable hyperlink rendering.
    pub fn with_hyperlinks(mut self, preserve: bool) -> Self {
        self.preserve_hyperlinks = preserve;
        self
    }

    /// Enable or disable heading detection.
    pub fn with_headings(mut self, detect: bool) -> Self {
        self.detect_headings = detect;
        self
    }

    /// Enable or disable list detection.
    pub fn with_lists(mut self, detect: bool) -> Self {
        self.detect_lists = detect;
        self
    }

    /// Enable or disable bold/italic emphasis.
    pub fn with_formatting(mut self, detect: bool) -> Self {
        self.detect_bold_italic = detect;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Set the absolute heading size threshold.
    pub fn with_heading_threshold(mut self, size: f32) -> Self {
        self.heading_font_size_threshold = size;
        self
    }

    /// Set the relative heading size ratio.
    pub fn with_heading_ratio(mut self, ratio: f32) -> Self {
        self.min_heading_size_ratio = ratio;
        self
    }

    /// Set the line merge threshold.
    pub fn with_line_merge_threshold(mut self, threshold: f32) -> Self {
        self.line_merge_threshold = threshold;
        self
    }

    /// Set the list indent width.
    pub fn with_list_indent(mut self, spaces: usize) -> Self {
        self.list_indent_spaces = spaces;
        self
    }

    /// Set the page separator.
    pub fn with_page_separator(mut self, separator: impl Into<String>) -> Self {
        self.page_separator = separator.into();
        self
    }

    /// Check every numeric option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_dpi == 0 {
            return Err(ConfigError::InvalidDpi(self.image_dpi));
        }
        if self.list_indent_spaces == 0 {
            return Err(ConfigError::InvalidIndentWidth(self.list_indent_spaces));
        }
        if !self.min_heading_size_ratio.is_finite() || self.min_heading_size_ratio <= 1.0 {
            return Err(ConfigError::InvalidHeadingRatio(self.min_heading_size_ratio));
        }
        if !self.heading_font_size_threshold.is_finite() || self.heading_font_size_threshold < 0.0
        {
            return Err(ConfigError::InvalidHeadingThreshold(
                self.heading_font_size_threshold,
            ));
        }
        if !self.line_merge_threshold.is_finite() || self.line_merge_threshold < 0.0 {
            return Err(ConfigError::InvalidMergeThreshold(self.line_merge_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = ConversionOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.image_dpi, 150);
        assert_eq!(options.list_indent_spaces, 4);
        assert_eq!(options.page_separator, "\n\n---\n\n");
    }

    #[test]
    fn test_image_format_parse() {
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            "gif".parse::<ImageFormat>(),
            Err(ConfigError::UnsupportedImageFormat("gif".into()))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_dpi = ConversionOptions::new().with_image_dpi(0);
        assert_eq!(zero_dpi.validate(), Err(ConfigError::InvalidDpi(0)));

        let zero_indent = ConversionOptions::new().with_list_indent(0);
        assert_eq!(
            zero_indent.validate(),
            Err(ConfigError::InvalidIndentWidth(0))
        );

        let flat_ratio = ConversionOptions::new().with_heading_ratio(1.0);
        assert!(matches!(
            flat_ratio.validate(),
            Err(ConfigError::InvalidHeadingRatio(_))
        ));

        let negative = ConversionOptions::new().with_line_merge_threshold(-1.0);
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidMergeThreshold(_))
        ));
    }

    #[test]
    fn test_empty_separator_allowed() {
        let options = ConversionOptions::new().with_page_separator("");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = ConversionOptions::new()
            .with_images(false)
            .with_hyperlinks(false)
            .with_formatting(false)
            .with_image_dir("img");
        assert!(!options.extract_images);
        assert!(!options.preserve_hyperlinks);
        assert!(!options.detect_bold_italic);
        assert_eq!(options.image_output_dir, Some(PathBuf::from("img")));
    }
}
