//! Page snapshot sources.

use std::path::Path;

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::content::interpret_page;
use crate::error::{Error, Result};
use crate::model::PageSnapshot;

/// Supplies decoded pages to the conversion pipeline, in page order.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Decode the page at 0-based `index`.
    fn page(&self, index: usize) -> Result<PageSnapshot>;
}

impl DocumentSource for [PageSnapshot] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page(&self, index: usize) -> Result<PageSnapshot> {
        self.get(index).cloned().ok_or_else(|| {
            Error::Corrupted(format!("page {} of {} requested", index + 1, self.len()))
        })
    }
}

impl DocumentSource for Vec<PageSnapshot> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page(&self, index: usize) -> Result<PageSnapshot> {
        self.as_slice().page(index)
    }
}

/// A PDF document decoded with lopdf.
pub struct LopdfSource<B: PdfBackend = LopdfBackend> {
    backend: B,
    pages: Vec<PageId>,
}

impl LopdfSource<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_backend(LopdfBackend::load_file(path)?))
    }

    /// Load a PDF from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_backend(LopdfBackend::load_bytes(data)?))
    }
}

impl<B: PdfBackend> LopdfSource<B> {
    /// Wrap an already loaded backend.
    pub fn from_backend(backend: B) -> Self {
        let pages = backend.pages().into_values().collect();
        Self { backend, pages }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PdfBackend> DocumentSource for LopdfSource<B> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageSnapshot> {
        let page_id = *self.pages.get(index).ok_or_else(|| {
            Error::Corrupted(format!(
                "page {} of {} requested",
                index + 1,
                self.pages.len()
            ))
        })?;
        interpret_page(&self.backend, page_id, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_vec_source() {
        let pages = vec![PageSnapshot::new(0), PageSnapshot::new(1)];
        assert_eq!(pages.page_count(), 2);
        assert_eq!(pages.page(1).unwrap().index, 1);
        assert!(matches!(pages.page(2), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_source_rejects_non_pdf() {
        assert!(matches!(
            LopdfSource::from_bytes(b"PK\x03\x04 zip archive"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_source_rejects_truncated_pdf() {
        let result = LopdfSource::from_bytes(b"%PDF-1.7\n1 0 obj\n<<");
        assert!(result.is_err());
    }
}
