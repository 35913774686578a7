//! Source document handling.
//!
//! A source is either a PDF (multi-page, structurally analyzable) or a
//! standalone table image (single page, vision-only). The kind is sniffed
//! from magic bytes, not the file extension. Documents are read-only once
//! opened and dropped when extraction completes or fails.

use std::path::Path;

use crate::error::ExtractionError;
use crate::raster::PageRasterizer;

/// MIME type of a rasterized or pass-through page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }
}

/// What kind of source was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image(ImageMime),
}

/// An opened source document: raw bytes plus sniffed kind.
#[derive(Debug)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    kind: SourceKind,
}

impl SourceDocument {
    /// Open a document from the filesystem.
    ///
    /// Any read or sniffing failure is `DocumentUnreadable`.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExtractionError::DocumentUnreadable(format!("{}: {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    /// Open a document from in-memory bytes (already materialized by the
    /// surrounding storage layer).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ExtractionError> {
        let kind = sniff_kind(&bytes)?;
        Ok(Self { bytes, kind })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of pages, in document order. Images are one-page documents.
    pub fn page_count(&self, rasterizer: &dyn PageRasterizer) -> Result<usize, ExtractionError> {
        match self.kind {
            SourceKind::Pdf => rasterizer.page_count(&self.bytes),
            SourceKind::Image(_) => Ok(1),
        }
    }

    /// Produce the raster image for one page, for the vision path.
    ///
    /// PDF pages are rendered to PNG at the given DPI; standalone images
    /// pass their original bytes through unchanged with their sniffed MIME
    /// type (no lossy re-encode).
    pub fn rasterize_page(
        &self,
        rasterizer: &dyn PageRasterizer,
        page_index: usize,
        dpi: u32,
    ) -> Result<(Vec<u8>, ImageMime), ExtractionError> {
        match self.kind {
            SourceKind::Pdf => {
                let png = rasterizer.render_page(&self.bytes, page_index, dpi)?;
                Ok((png, ImageMime::Png))
            }
            SourceKind::Image(mime) => {
                if page_index != 0 {
                    return Err(ExtractionError::PdfRendering {
                        page: page_index,
                        reason: "image documents have exactly one page".into(),
                    });
                }
                Ok((self.bytes.clone(), mime))
            }
        }
    }
}

/// Sniff the document kind from magic bytes.
fn sniff_kind(bytes: &[u8]) -> Result<SourceKind, ExtractionError> {
    if bytes.starts_with(b"%PDF-") {
        return Ok(SourceKind::Pdf);
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Ok(SourceKind::Image(ImageMime::Png));
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(SourceKind::Image(ImageMime::Jpeg));
    }
    Err(ExtractionError::DocumentUnreadable(
        "not a PDF, PNG, or JPEG".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{minimal_png, MockRasterizer};

    #[test]
    fn sniffs_pdf_magic() {
        let doc = SourceDocument::from_bytes(b"%PDF-1.4 fake".to_vec()).unwrap();
        assert_eq!(doc.kind(), SourceKind::Pdf);
    }

    #[test]
    fn sniffs_png_magic() {
        let doc = SourceDocument::from_bytes(minimal_png()).unwrap();
        assert_eq!(doc.kind(), SourceKind::Image(ImageMime::Png));
    }

    #[test]
    fn sniffs_jpeg_magic() {
        let doc = SourceDocument::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
        assert_eq!(doc.kind(), SourceKind::Image(ImageMime::Jpeg));
    }

    #[test]
    fn unknown_bytes_are_unreadable() {
        let err = SourceDocument::from_bytes(b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentUnreadable(_)));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = SourceDocument::open(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentUnreadable(_)));
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, minimal_png()).unwrap();

        let doc = SourceDocument::open(&path).unwrap();
        assert_eq!(doc.kind(), SourceKind::Image(ImageMime::Png));
    }

    #[test]
    fn image_has_one_page() {
        let doc = SourceDocument::from_bytes(minimal_png()).unwrap();
        let rasterizer = MockRasterizer::new(0);
        assert_eq!(doc.page_count(&rasterizer).unwrap(), 1);
    }

    #[test]
    fn pdf_page_count_comes_from_rasterizer() {
        let doc = SourceDocument::from_bytes(b"%PDF-1.4 fake".to_vec()).unwrap();
        let rasterizer = MockRasterizer::new(4);
        assert_eq!(doc.page_count(&rasterizer).unwrap(), 4);
    }

    #[test]
    fn image_raster_passes_bytes_through() {
        let png = minimal_png();
        let doc = SourceDocument::from_bytes(png.clone()).unwrap();
        let rasterizer = MockRasterizer::new(0);

        let (bytes, mime) = doc.rasterize_page(&rasterizer, 0, 300).unwrap();
        assert_eq!(bytes, png);
        assert_eq!(mime, ImageMime::Png);
        // The rasterizer is never consulted for images.
        assert!(rasterizer.rendered_pages().is_empty());
    }

    #[test]
    fn image_second_page_is_an_error() {
        let doc = SourceDocument::from_bytes(minimal_png()).unwrap();
        let rasterizer = MockRasterizer::new(0);
        assert!(doc.rasterize_page(&rasterizer, 1, 300).is_err());
    }

    #[test]
    fn pdf_raster_renders_png() {
        let doc = SourceDocument::from_bytes(b"%PDF-1.4 fake".to_vec()).unwrap();
        let rasterizer = MockRasterizer::new(2);

        let (bytes, mime) = doc.rasterize_page(&rasterizer, 1, 300).unwrap();
        assert_eq!(mime, ImageMime::Png);
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
        assert_eq!(rasterizer.rendered_pages(), vec![1]);
    }
}
