//! PDF header sniffing.
//!
//! Readers accept a `%PDF-x.y` header anywhere in the first kilobyte, so
//! the check scans that window instead of insisting on offset zero.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of the `%PDF-` marker
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"
const HEADER_WINDOW: usize = 1024;

/// Sniff the header of a file on disk.
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let mut file = File::open(path)?;
    let mut window = Vec::with_capacity(HEADER_WINDOW);
    file.by_ref()
        .take(HEADER_WINDOW as u64)
        .read_to_end(&mut window)?;
    sniff_bytes(&window)
}

/// Sniff the header of an in-memory document.
///
/// Returns [`Error::UnknownFormat`] when no `%PDF-x.y` marker is present
/// in the first kilobyte.
pub fn sniff_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    if !is_valid_version(version_bytes) {
        return Err(Error::UnknownFormat);
    }

    Ok(PdfHeader {
        version: String::from_utf8_lossy(version_bytes).into_owned(),
        offset,
    })
}

fn is_valid_version(version: &[u8]) -> bool {
    matches!(version, [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit())
}

/// Check whether bytes look like a PDF document.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_valid_pdf() {
        let header = sniff_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(header.version, "1.7");
        assert_eq!(header.offset, 0);
    }

    #[test]
    fn test_sniff_header_after_junk() {
        let mut data = b"garbage-preamble\r\n".to_vec();
        data.extend_from_slice(b"%PDF-2.0\n");
        let header = sniff_bytes(&data).unwrap();
        assert_eq!(header.version, "2.0");
        assert_eq!(header.offset, 18);
    }

    #[test]
    fn test_sniff_rejects_html() {
        let result = sniff_bytes(b"<!DOCTYPE html><html></html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_sniff_truncated_version() {
        assert!(matches!(sniff_bytes(b"%PDF-1"), Err(Error::UnknownFormat)));
        assert!(matches!(sniff_bytes(b""), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_sniff_header_beyond_window() {
        let mut data = vec![b' '; HEADER_WINDOW + 10];
        data.extend_from_slice(b"%PDF-1.4\n");
        assert!(!is_pdf_bytes(&data));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version(b"1.0"));
        assert!(is_valid_version(b"2.0"));
        assert!(!is_valid_version(b"1x7"));
        assert!(!is_valid_version(b"abc"));
    }
}
