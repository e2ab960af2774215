//! Rendering of classified documents to Markdown and JSON.

mod json;
mod markdown;
mod result;

pub use json::{to_json, JsonFormat};
pub use markdown::{escape_markdown, marker_label, to_markdown, MarkdownRenderer};
pub use result::ExtractionStats;
