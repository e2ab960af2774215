//! Layout reconstruction: from positioned spans to classified blocks.
//!
//! The stages run in a fixed order per page: line assembly, hyperlink
//! overlay, classification (consulting the table detector and the list
//! tracker), then cross-page merging.

pub mod classify;
pub mod fonts;
pub mod lines;
pub mod links;
pub mod lists;
pub mod merge;
pub mod table_detector;

pub use classify::Classifier;
pub use fonts::{FontStatistics, HeadingScale};
pub use lines::{assemble_lines, normalize_text};
pub use links::map_links;
pub use lists::{parse_marker, ListContext, MarkerToken, ParsedMarker};
pub use merge::PageMerger;
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig};
