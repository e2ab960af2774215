//! Document model types.
//!
//! Page snapshots are the decoder-facing input; lines, blocks and the
//! document are what the layout engine builds from them.

mod block;
mod document;
mod geometry;
mod snapshot;

pub use block::{
    is_spaceless_script_char, size_key, Block, ImageRef, Line, ListMarker, MarkerFamily,
    MarkerKind, TableRow, TextBody,
};
pub use document::{Document, DocumentItem};
pub use geometry::Rect;
pub use snapshot::{
    ImageBlob, LinkAnnotation, NativeImageFormat, PageSnapshot, Point, Ruling, Span, StyleFlags,
};
