//! PDF decoding.
//!
//! Turns PDF files into [`PageSnapshot`](crate::model::PageSnapshot)s for
//! the layout engine. Everything lopdf-specific lives behind the
//! [`PdfBackend`] trait.

pub mod backend;
mod content;
mod source;

pub use backend::{LopdfBackend, PdfBackend};
pub use content::{interpret_page, Matrix, PageInterpreter};
pub use source::{DocumentSource, LopdfSource};
